//! Cart and checkout conversions.

use vernont_core::CurrencyCode;

use crate::api::dto::{
    CartDto, CompletionDto, LineItemDto, ShippingMethodDto, ShippingOptionDto,
};
use crate::api::types::{
    AppliedGiftCard, Cart, CartCompletion, LineItem, PaymentSession, ShippingMethod,
    ShippingOption,
};

use super::{SchemaError, count, currency, money};

fn convert_line_item(dto: LineItemDto, currency: CurrencyCode) -> Result<LineItem, SchemaError> {
    Ok(LineItem {
        id: dto.id,
        variant_id: dto.variant_id,
        product_id: dto.product_id,
        product_handle: dto.product_handle,
        title: dto.title,
        variant_title: dto.variant_title.filter(|v| !v.is_empty()),
        thumbnail: dto.thumbnail,
        quantity: count("quantity", dto.quantity)?,
        unit_price: money(dto.unit_price, currency),
        total: money(dto.total, currency),
    })
}

pub(crate) fn convert_shipping_method(
    dto: ShippingMethodDto,
    currency: CurrencyCode,
) -> ShippingMethod {
    ShippingMethod {
        shipping_option_id: dto.shipping_option_id,
        name: dto.name,
        amount: money(dto.amount, currency),
    }
}

pub fn convert_cart(dto: CartDto) -> Result<Cart, SchemaError> {
    let currency = currency(&dto.currency_code)?;

    let items = dto
        .items
        .into_iter()
        .map(|item| convert_line_item(item, currency))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Cart {
        id: dto.id,
        currency,
        email: dto.email.filter(|e| !e.is_empty()),
        customer_id: dto.customer_id,
        items,
        shipping_address: dto.shipping_address,
        billing_address: dto.billing_address,
        shipping_methods: dto
            .shipping_methods
            .into_iter()
            .map(|m| convert_shipping_method(m, currency))
            .collect(),
        discount_codes: dto.discounts.into_iter().map(|d| d.code).collect(),
        gift_cards: dto
            .gift_cards
            .into_iter()
            .map(|g| AppliedGiftCard {
                code: g.code,
                balance: g.balance.map(|b| money(b, currency)),
            })
            .collect(),
        payment_session: dto.payment_session.map(|p| PaymentSession {
            provider_id: p.provider_id,
            status: p.status,
            redirect_url: p.redirect_url.filter(|u| !u.is_empty()),
        }),
        payment_providers: dto.payment_providers,
        subtotal: money(dto.subtotal, currency),
        discount_total: money(dto.discount_total, currency),
        shipping_total: money(dto.shipping_total, currency),
        tax_total: money(dto.tax_total, currency),
        gift_card_total: money(dto.gift_card_total, currency),
        total: money(dto.total, currency),
        completed: dto.completed_at.is_some(),
    })
}

pub fn convert_shipping_option(
    dto: ShippingOptionDto,
    currency: CurrencyCode,
) -> ShippingOption {
    ShippingOption {
        id: dto.id,
        name: dto.name,
        amount: money(dto.amount, currency),
        estimated_delivery: dto.estimated_delivery,
    }
}

pub fn convert_completion(dto: CompletionDto) -> Result<CartCompletion, SchemaError> {
    match dto {
        CompletionDto::Order { order } => Ok(CartCompletion::Order(Box::new(
            super::convert_order(*order)?,
        ))),
        CompletionDto::Cart { cart, error } => Ok(CartCompletion::Cart {
            cart: Box::new(convert_cart(*cart)?),
            message: error.message,
        }),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use vernont_core::Money;

    fn cart_json() -> serde_json::Value {
        serde_json::json!({
            "id": "cart_1",
            "currency_code": "eur",
            "email": "",
            "items": [
                {
                    "id": "item_1", "variant_id": "variant_50", "product_id": "prod_1",
                    "product_handle": "santal-noir", "title": "Santal Noir",
                    "quantity": 2, "unit_price": 17000, "total": 34000
                },
                {
                    "id": "item_2", "variant_id": "variant_10", "product_id": "prod_2",
                    "product_handle": "iris-pallida", "title": "Iris Pallida",
                    "variant_title": "", "quantity": 1, "unit_price": 9000, "total": 9000
                }
            ],
            "discounts": [{ "code": "WELCOME10" }],
            "gift_cards": [{ "code": "GC-1234", "balance": 500 }],
            "payment_session": { "provider_id": "stripe", "status": "pending", "redirect_url": "" },
            "subtotal": 43000,
            "discount_total": 4300,
            "gift_card_total": 2000,
            "total": 36700
        })
    }

    #[test]
    fn test_convert_cart() {
        let dto: CartDto = serde_json::from_value(cart_json()).unwrap();
        let cart = convert_cart(dto).unwrap();

        assert_eq!(cart.currency, CurrencyCode::EUR);
        assert_eq!(cart.email, None);
        assert_eq!(cart.item_count(), 3);
        assert_eq!(cart.items[1].variant_title, None);
        assert_eq!(cart.discount_codes, vec!["WELCOME10"]);
        assert_eq!(
            cart.gift_cards[0].balance,
            Some(Money::new(500, CurrencyCode::EUR))
        );
        assert_eq!(cart.payment_session.unwrap().redirect_url, None);
        assert_eq!(cart.total, Money::new(36_700, CurrencyCode::EUR));
        assert!(!cart.completed);
    }

    #[test]
    fn test_convert_cart_rejects_negative_quantity() {
        let mut json = cart_json();
        json["items"][0]["quantity"] = (-1).into();
        let dto: CartDto = serde_json::from_value(json).unwrap();
        assert!(matches!(
            convert_cart(dto),
            Err(SchemaError::OutOfRange { field: "quantity", .. })
        ));
    }

    #[test]
    fn test_convert_completion_failure_keeps_cart() {
        let dto: CompletionDto = serde_json::from_value(serde_json::json!({
            "type": "cart",
            "cart": cart_json(),
            "error": { "message": "Payment was declined" }
        }))
        .unwrap();
        match convert_completion(dto).unwrap() {
            CartCompletion::Cart { cart, message } => {
                assert_eq!(cart.id.as_str(), "cart_1");
                assert_eq!(message, "Payment was declined");
            }
            CartCompletion::Order(_) => panic!("expected cart"),
        }
    }
}

//! Order and return conversions.

use vernont_core::CurrencyCode;

use crate::api::dto::{OrderDto, OrderItemDto, OrderListDto, ReturnDto};
use crate::api::types::{Order, OrderItem, OrderPage, ReturnLine, ReturnRequest};

use super::cart::convert_shipping_method;
use super::{SchemaError, count, currency, money};

fn convert_order_item(dto: OrderItemDto, currency: CurrencyCode) -> Result<OrderItem, SchemaError> {
    Ok(OrderItem {
        id: dto.id,
        product_handle: dto.product_handle,
        title: dto.title,
        variant_title: dto.variant_title.filter(|v| !v.is_empty()),
        thumbnail: dto.thumbnail,
        quantity: count("quantity", dto.quantity)?,
        returned_quantity: count("returned_quantity", dto.returned_quantity)?,
        unit_price: money(dto.unit_price, currency),
        total: money(dto.total, currency),
    })
}

pub fn convert_order(dto: OrderDto) -> Result<Order, SchemaError> {
    let currency = currency(&dto.currency_code)?;
    let display_id = u64::try_from(dto.display_id).map_err(|_| SchemaError::OutOfRange {
        field: "display_id",
        value: dto.display_id,
    })?;

    Ok(Order {
        id: dto.id,
        display_id,
        created_at: dto.created_at,
        status: dto.status,
        fulfillment_status: dto.fulfillment_status,
        payment_status: dto.payment_status,
        email: dto.email,
        currency,
        items: dto
            .items
            .into_iter()
            .map(|item| convert_order_item(item, currency))
            .collect::<Result<Vec<_>, _>>()?,
        shipping_address: dto.shipping_address,
        shipping_methods: dto
            .shipping_methods
            .into_iter()
            .map(|m| convert_shipping_method(m, currency))
            .collect(),
        subtotal: money(dto.subtotal, currency),
        discount_total: money(dto.discount_total, currency),
        shipping_total: money(dto.shipping_total, currency),
        tax_total: money(dto.tax_total, currency),
        total: money(dto.total, currency),
    })
}

pub fn convert_order_page(dto: OrderListDto) -> Result<OrderPage, SchemaError> {
    Ok(OrderPage {
        orders: dto
            .orders
            .into_iter()
            .map(convert_order)
            .collect::<Result<Vec<_>, _>>()?,
        count: count("count", dto.count)?,
        offset: count("offset", dto.offset)?,
        limit: count("limit", dto.limit)?,
    })
}

pub fn convert_return(dto: ReturnDto) -> Result<ReturnRequest, SchemaError> {
    let refund_amount = match (dto.refund_amount, dto.currency_code.as_deref()) {
        (Some(amount), Some(code)) => Some(money(amount, currency(code)?)),
        _ => None,
    };
    let order_display_id = dto
        .order_display_id
        .map(|id| {
            u64::try_from(id).map_err(|_| SchemaError::OutOfRange {
                field: "order_display_id",
                value: id,
            })
        })
        .transpose()?;

    Ok(ReturnRequest {
        id: dto.id,
        order_id: dto.order_id,
        order_display_id,
        kind: dto.kind,
        status: dto.status,
        created_at: dto.created_at,
        items: dto
            .items
            .into_iter()
            .map(|item| {
                Ok(ReturnLine {
                    item_id: item.item_id,
                    title: item.title,
                    quantity: count("quantity", item.quantity)?,
                    reason: item.reason,
                })
            })
            .collect::<Result<Vec<_>, SchemaError>>()?,
        refund_amount,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use vernont_core::{FulfillmentStatus, Money, ReturnKind, ReturnStatus};

    #[test]
    fn test_convert_order() {
        let dto: OrderDto = serde_json::from_value(serde_json::json!({
            "id": "order_1",
            "display_id": 1042,
            "created_at": "2026-04-02T09:30:00Z",
            "status": "pending",
            "fulfillment_status": "shipped",
            "payment_status": "captured",
            "email": "claire@maison.fr",
            "currency_code": "gbp",
            "items": [{
                "id": "item_1", "title": "Oud Royal", "quantity": 2,
                "returned_quantity": 1, "unit_price": 21000, "total": 42000
            }],
            "shipping_methods": [{ "shipping_option_id": "so_1", "name": "Express", "amount": 1500 }],
            "subtotal": 42000,
            "shipping_total": 1500,
            "total": 43500
        }))
        .unwrap();

        let order = convert_order(dto).unwrap();
        assert_eq!(order.display_id, 1042);
        assert_eq!(order.fulfillment_status, FulfillmentStatus::Shipped);
        assert_eq!(order.items[0].returnable_quantity(), 1);
        assert!(order.has_returnable_items());
        assert_eq!(
            order.shipping_methods[0].amount,
            Money::new(1500, CurrencyCode::GBP)
        );
    }

    #[test]
    fn test_convert_return() {
        let dto: ReturnDto = serde_json::from_value(serde_json::json!({
            "id": "ret_1",
            "order_id": "order_1",
            "order_display_id": 1042,
            "kind": "exchange",
            "status": "approved",
            "created_at": "2026-04-10T12:00:00Z",
            "items": [{ "item_id": "item_1", "title": "Oud Royal", "quantity": 1, "reason": "Wrong size" }],
            "refund_amount": 21000,
            "currency_code": "gbp"
        }))
        .unwrap();

        let request = convert_return(dto).unwrap();
        assert_eq!(request.kind, ReturnKind::Exchange);
        assert_eq!(request.status, ReturnStatus::Approved);
        assert_eq!(
            request.refund_amount,
            Some(Money::new(21_000, CurrencyCode::GBP))
        );
    }
}

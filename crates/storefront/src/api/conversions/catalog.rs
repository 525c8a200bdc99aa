//! Store settings, product and review conversions.

use crate::api::dto::{
    ImageDto, ProductDto, ProductListDto, ReviewDto, ReviewListDto, StoreSettingsDto, VariantDto,
};
use crate::api::types::{
    FragranceNotes, Image, Product, ProductPage, RatingSummary, Review, ReviewPage, ReviewSummary,
    StoreSettings, Variant,
};

use super::{SchemaError, count, currency, money};

const DEFAULT_RETURN_WINDOW_DAYS: u32 = 30;

// =============================================================================
// Store Settings
// =============================================================================

pub fn convert_store_settings(dto: StoreSettingsDto) -> Result<StoreSettings, SchemaError> {
    let default_currency = currency(&dto.default_currency_code)?;

    let mut currencies = vec![default_currency];
    for code in &dto.currencies {
        let parsed = currency(code)?;
        if !currencies.contains(&parsed) {
            currencies.push(parsed);
        }
    }

    let free_shipping_thresholds = dto
        .free_shipping_thresholds
        .into_iter()
        .map(|t| Ok(money(t.amount, currency(&t.currency_code)?)))
        .collect::<Result<Vec<_>, SchemaError>>()?;

    let return_window_days = match dto.return_window_days {
        Some(days) => count("return_window_days", days)?,
        None => DEFAULT_RETURN_WINDOW_DAYS,
    };

    Ok(StoreSettings {
        name: dto.name,
        default_currency,
        currencies,
        free_shipping_thresholds,
        support_email: dto.support_email.filter(|e| !e.is_empty()),
        return_window_days,
    })
}

// =============================================================================
// Products
// =============================================================================

fn convert_image(dto: ImageDto) -> Image {
    Image {
        url: dto.url,
        alt: dto.alt.filter(|a| !a.is_empty()),
    }
}

fn convert_variant(dto: VariantDto) -> Result<Variant, SchemaError> {
    let price_currency = currency(&dto.calculated_price.currency_code)?;
    let inventory_quantity = if dto.manage_inventory {
        // Oversold stock is reported as negative; treat it as sold out.
        dto.inventory_quantity
            .map(|q| count("inventory_quantity", q.max(0)))
            .transpose()?
    } else {
        None
    };

    Ok(Variant {
        id: dto.id,
        title: dto.title,
        sku: dto.sku,
        price: money(dto.calculated_price.calculated_amount, price_currency),
        compare_at_price: dto
            .calculated_price
            .original_amount
            .filter(|&original| original != dto.calculated_price.calculated_amount)
            .map(|original| money(original, price_currency)),
        inventory_quantity,
        allow_backorder: dto.allow_backorder,
    })
}

pub fn convert_product(dto: ProductDto) -> Result<Product, SchemaError> {
    let variants = dto
        .variants
        .into_iter()
        .map(convert_variant)
        .collect::<Result<Vec<_>, _>>()?;

    let rating = match dto.rating {
        Some(r) if r.count > 0 => Some(RatingSummary {
            average: r.average.clamp(0.0, 5.0),
            count: count("rating.count", r.count)?,
        }),
        _ => None,
    };

    let images: Vec<Image> = dto.images.into_iter().map(convert_image).collect();
    let thumbnail = dto
        .thumbnail
        .filter(|t| !t.is_empty())
        .map(|url| Image {
            url,
            alt: Some(dto.title.clone()),
        })
        .or_else(|| images.first().cloned());

    let notes = dto.notes.unwrap_or_default();

    Ok(Product {
        id: dto.id,
        handle: dto.handle,
        title: dto.title,
        subtitle: dto.subtitle.filter(|s| !s.is_empty()),
        description: dto.description.unwrap_or_default(),
        brand: dto.brand,
        concentration: dto.concentration,
        category: dto.category,
        thumbnail,
        images,
        notes: FragranceNotes {
            top: notes.top,
            heart: notes.heart,
            base: notes.base,
        },
        variants,
        rating,
        tags: dto.tags,
    })
}

pub fn convert_product_page(dto: ProductListDto) -> Result<ProductPage, SchemaError> {
    Ok(ProductPage {
        products: dto
            .products
            .into_iter()
            .map(convert_product)
            .collect::<Result<Vec<_>, _>>()?,
        count: count("count", dto.count)?,
        offset: count("offset", dto.offset)?,
        limit: count("limit", dto.limit)?,
    })
}

// =============================================================================
// Reviews
// =============================================================================

pub fn convert_review(dto: ReviewDto) -> Result<Review, SchemaError> {
    let rating = u8::try_from(dto.rating)
        .ok()
        .filter(|r| (1..=5).contains(r))
        .ok_or(SchemaError::Rating(dto.rating))?;

    Ok(Review {
        id: dto.id,
        author_name: dto.author_name,
        rating,
        title: dto.title.filter(|t| !t.is_empty()),
        content: dto.content,
        created_at: dto.created_at,
        verified_purchase: dto.verified_purchase,
        helpful_count: count("helpful_count", dto.helpful_count)?,
    })
}

pub fn convert_review_page(dto: ReviewListDto) -> Result<ReviewPage, SchemaError> {
    let buckets = dto.summary.distribution.len();
    let mut distribution = [0_u32; 5];
    if buckets != 0 {
        if buckets != distribution.len() {
            return Err(SchemaError::Distribution(buckets));
        }
        for (slot, value) in distribution.iter_mut().zip(dto.summary.distribution) {
            *slot = count("distribution", value)?;
        }
    }

    Ok(ReviewPage {
        reviews: dto
            .reviews
            .into_iter()
            .map(convert_review)
            .collect::<Result<Vec<_>, _>>()?,
        count: count("count", dto.count)?,
        offset: count("offset", dto.offset)?,
        limit: count("limit", dto.limit)?,
        summary: ReviewSummary {
            average: dto.summary.average.clamp(0.0, 5.0),
            count: count("summary.count", dto.summary.count)?,
            distribution,
        },
    })
}

//! Product route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;
use vernont_core::{CurrencyCode, VariantId};

use crate::api::{
    ApiError, Product, ProductPage, ProductQuery, ProductSort, ReviewQuery, ReviewSort, Variant,
};
use crate::error::{AppError, Result};
use crate::filters;
use crate::layout::Layout;
use crate::models::{Wishlist, session};
use crate::state::AppState;

use super::reviews::{ReviewForm, ReviewsView};

/// Products per listing page.
pub const PER_PAGE: u32 = 12;

// =============================================================================
// Views
// =============================================================================

/// Image display data for templates.
#[derive(Debug, Clone)]
pub struct ImageView {
    pub url: String,
    pub alt: String,
}

/// Product card on listings, search results and the wishlist.
#[derive(Debug, Clone)]
pub struct ProductCardView {
    pub id: String,
    pub handle: String,
    pub title: String,
    pub subtitle: Option<String>,
    /// "From €150.00" when sizes are priced differently.
    pub price: String,
    pub image: Option<ImageView>,
    pub in_stock: bool,
    pub rating: Option<String>,
    pub in_wishlist: bool,
}

impl ProductCardView {
    #[must_use]
    pub fn new(product: &Product, wishlist: &Wishlist) -> Self {
        let prices_differ = product
            .variants
            .windows(2)
            .any(|pair| matches!(pair, [a, b] if a.price != b.price));
        let price = match product.lowest_price() {
            Some(price) if prices_differ => format!("From {price}"),
            Some(price) => price.to_string(),
            None => String::new(),
        };
        let image = product
            .thumbnail
            .as_ref()
            .or_else(|| product.images.first())
            .map(|img| ImageView {
                url: img.url.clone(),
                alt: img.alt.clone().unwrap_or_else(|| product.title.clone()),
            });

        Self {
            id: product.id.to_string(),
            handle: product.handle.clone(),
            title: product.title.clone(),
            subtitle: product
                .concentration
                .clone()
                .or_else(|| product.subtitle.clone()),
            price,
            image,
            in_stock: product.in_stock(),
            rating: product
                .rating
                .filter(|r| r.count > 0)
                .map(|r| format!("{:.1}", r.average)),
            in_wishlist: wishlist.contains(&product.id),
        }
    }
}

/// Size option on the product page.
#[derive(Debug, Clone)]
pub struct VariantView {
    pub id: String,
    pub title: String,
    pub price: String,
    pub compare_at_price: Option<String>,
    pub in_stock: bool,
    pub selected: bool,
}

/// Stock line under the price.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockStatus {
    InStock,
    LowStock(u32),
    OutOfStock,
}

impl StockStatus {
    #[must_use]
    pub fn of(variant: &Variant) -> Self {
        if !variant.in_stock() {
            Self::OutOfStock
        } else if variant.low_stock() {
            Self::LowStock(variant.inventory_quantity.unwrap_or_default())
        } else {
            Self::InStock
        }
    }

    #[must_use]
    pub fn label(self) -> String {
        match self {
            Self::InStock => "In stock".to_string(),
            Self::LowStock(left) => format!("Only {left} left"),
            Self::OutOfStock => "Out of stock".to_string(),
        }
    }

    #[must_use]
    pub const fn can_purchase(self) -> bool {
        !matches!(self, Self::OutOfStock)
    }
}

/// Product detail display data.
#[derive(Debug, Clone)]
pub struct ProductView {
    pub id: String,
    pub handle: String,
    pub title: String,
    pub brand: Option<String>,
    pub concentration: Option<String>,
    pub description: String,
    pub images: Vec<ImageView>,
    pub top_notes: String,
    pub heart_notes: String,
    pub base_notes: String,
    pub has_notes: bool,
    pub variants: Vec<VariantView>,
    pub selected_variant_id: Option<String>,
    pub price: String,
    pub compare_at_price: Option<String>,
    pub stock: String,
    pub can_purchase: bool,
    pub in_wishlist: bool,
}

impl ProductView {
    /// Build the detail view with `requested` preselected when it belongs to
    /// the product, otherwise the first variant in stock.
    #[must_use]
    pub fn new(product: &Product, requested: Option<&VariantId>, wishlist: &Wishlist) -> Self {
        let selected = requested
            .and_then(|id| product.variant(id))
            .or_else(|| product.default_variant());

        let mut images: Vec<ImageView> = product
            .images
            .iter()
            .map(|img| ImageView {
                url: img.url.clone(),
                alt: img.alt.clone().unwrap_or_else(|| product.title.clone()),
            })
            .collect();
        if images.is_empty()
            && let Some(thumb) = &product.thumbnail
        {
            images.push(ImageView {
                url: thumb.url.clone(),
                alt: thumb.alt.clone().unwrap_or_else(|| product.title.clone()),
            });
        }

        let variants = product
            .variants
            .iter()
            .map(|v| VariantView {
                id: v.id.to_string(),
                title: v.title.clone(),
                price: v.price.to_string(),
                compare_at_price: v
                    .compare_at_price
                    .filter(|_| v.on_sale())
                    .map(|c| c.to_string()),
                in_stock: v.in_stock(),
                selected: selected.is_some_and(|s| s.id == v.id),
            })
            .collect();

        let stock = selected.map_or(StockStatus::OutOfStock, StockStatus::of);

        Self {
            id: product.id.to_string(),
            handle: product.handle.clone(),
            title: product.title.clone(),
            brand: product.brand.clone(),
            concentration: product.concentration.clone(),
            description: product.description.clone(),
            images,
            top_notes: product.notes.top.join(", "),
            heart_notes: product.notes.heart.join(", "),
            base_notes: product.notes.base.join(", "),
            has_notes: !product.notes.is_empty(),
            variants,
            selected_variant_id: selected.map(|v| v.id.to_string()),
            price: selected.map(|v| v.price.to_string()).unwrap_or_default(),
            compare_at_price: selected
                .filter(|v| v.on_sale())
                .and_then(|v| v.compare_at_price)
                .map(|c| c.to_string()),
            stock: stock.label(),
            can_purchase: stock.can_purchase(),
            in_wishlist: wishlist.contains(&product.id),
        }
    }
}

/// Sort option in the listing toolbar.
#[derive(Debug, Clone)]
pub struct SortOption {
    pub value: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

/// Previous/next page links.
#[derive(Debug, Clone)]
pub struct Pagination {
    pub current_page: u32,
    pub total_pages: u32,
    pub prev_url: Option<String>,
    pub next_url: Option<String>,
}

impl Pagination {
    /// Links built by appending `page=N` to `base` (which ends with `?` or
    /// `&`).
    #[must_use]
    pub fn new(current_page: u32, total_pages: u32, base: &str) -> Self {
        Self::named(current_page, total_pages, base, "page")
    }

    /// Like [`Pagination::new`] with a different query parameter.
    #[must_use]
    pub fn named(current_page: u32, total_pages: u32, base: &str, param: &str) -> Self {
        Self {
            current_page,
            total_pages,
            prev_url: (current_page > 1).then(|| format!("{base}{param}={}", current_page - 1)),
            next_url: (current_page < total_pages)
                .then(|| format!("{base}{param}={}", current_page + 1)),
        }
    }

    /// Pagination of an offset/limit listing of `count` entries.
    #[must_use]
    pub fn for_offset(count: u32, offset: u32, limit: u32, base: &str, param: &str) -> Self {
        let (current_page, total_pages) = if limit == 0 {
            (1, 1)
        } else {
            (offset / limit + 1, count.div_ceil(limit).max(1))
        };
        Self::named(current_page, total_pages, base, param)
    }

    #[must_use]
    pub fn of(page: &ProductPage, base: &str) -> Self {
        Self::new(page.current_page(), page.total_pages(), base)
    }
}

// =============================================================================
// Query Types
// =============================================================================

/// Listing query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct ListingQuery {
    pub category: Option<String>,
    pub sort: Option<String>,
    pub page: Option<u32>,
}

/// Detail query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct ShowQuery {
    pub variant: Option<String>,
    /// `submitted` after a review was accepted.
    pub review: Option<String>,
    pub review_sort: Option<String>,
    pub review_page: Option<u32>,
}

// =============================================================================
// Templates
// =============================================================================

/// Product listing page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/index.html")]
pub struct ProductsIndexTemplate {
    pub layout: Layout,
    pub products: Vec<ProductCardView>,
    pub category: Option<String>,
    pub sort_options: Vec<SortOption>,
    pub total: u32,
    pub pagination: Pagination,
}

/// Product detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/show.html")]
pub struct ProductShowTemplate {
    pub layout: Layout,
    pub product: ProductView,
    pub reviews: Option<ReviewsView>,
    pub review_form: ReviewForm,
}

// =============================================================================
// Handlers
// =============================================================================

/// Display the product listing.
#[instrument(skip(state, session, layout))]
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    layout: Layout,
    Query(query): Query<ListingQuery>,
) -> Result<impl IntoResponse> {
    let category = query
        .category
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty());
    let sort = ProductSort::parse(query.sort.as_deref().unwrap_or_default());

    let mut request = ProductQuery::page(layout.currency, query.page.unwrap_or(1).max(1), PER_PAGE);
    request.category.clone_from(&category);
    request.sort = sort;

    let page = state.commerce().list_products(&request).await?;
    let wishlist = session::wishlist(&session).await;

    let mut base = String::from("/products?");
    if let Some(category) = &category {
        base.push_str(&format!("category={}&", urlencoding::encode(category)));
    }
    if sort != ProductSort::default() {
        base.push_str(&format!("sort={}&", sort.as_str()));
    }

    Ok(ProductsIndexTemplate {
        products: page
            .products
            .iter()
            .map(|p| ProductCardView::new(p, &wishlist))
            .collect(),
        category,
        sort_options: ProductSort::ALL
            .into_iter()
            .map(|s| SortOption {
                value: s.as_str(),
                label: s.label(),
                selected: s == sort,
            })
            .collect(),
        total: page.count,
        pagination: Pagination::of(&page, &base),
        layout,
    })
}

/// Display a product with its reviews.
#[instrument(skip(state, session, layout, query))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    layout: Layout,
    Path(handle): Path<String>,
    Query(query): Query<ShowQuery>,
) -> Result<Response> {
    let review_form = ReviewForm {
        submitted: query.review.as_deref() == Some("submitted"),
        ..ReviewForm::default()
    };
    render_show(&state, &session, layout, &handle, &query, review_form).await
}

/// Render the product page, with `review_form` carrying any rejected review
/// submission.
pub(crate) async fn render_show(
    state: &AppState,
    session: &Session,
    layout: Layout,
    handle: &str,
    query: &ShowQuery,
    review_form: ReviewForm,
) -> Result<Response> {
    let product = load_product(state, handle, layout.currency).await?;
    let wishlist = session::wishlist(session).await;
    let requested = query.variant.as_deref().map(VariantId::from);

    let sort = ReviewSort::parse(query.review_sort.as_deref().unwrap_or_default());
    let review_page = query.review_page.unwrap_or(1).max(1);
    let reviews = match state
        .commerce()
        .product_reviews(&product.id, ReviewQuery::page(sort, review_page))
        .await
    {
        Ok(page) => {
            let voted = session::helpful_votes(session).await;
            Some(ReviewsView::new(&product.handle, &page, sort, &voted))
        }
        Err(e) => {
            tracing::warn!(error = %e, product_id = %product.id, "Reviews unavailable");
            None
        }
    };

    let status = if review_form.errors.is_empty() && review_form.message.is_none() {
        StatusCode::OK
    } else {
        StatusCode::UNPROCESSABLE_ENTITY
    };

    Ok((
        status,
        ProductShowTemplate {
            product: ProductView::new(&product, requested.as_ref(), &wishlist),
            reviews,
            review_form,
            layout,
        },
    )
        .into_response())
}

/// Load a product, mapping a missing handle to a 404 page.
pub(crate) async fn load_product(
    state: &AppState,
    handle: &str,
    currency: CurrencyCode,
) -> Result<Product> {
    match state.commerce().product_by_handle(handle, currency).await {
        Ok(product) => Ok(product),
        Err(ApiError::NotFound(_)) => Err(AppError::NotFound(format!("product {handle}"))),
        Err(e) => Err(e.into()),
    }
}

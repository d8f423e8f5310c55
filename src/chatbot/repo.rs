use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

/// Menu item row as stored.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub category: String,
    pub food_type: String,        // "Veg" | "Non-Veg" | other
    pub price: i32,               // whole rupees
    pub image: Option<String>,
    pub shop_name: String,
    pub rating_average: f64,
    pub rating_count: i32,
    pub is_available: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProductSort {
    #[default]
    Rating,
    PriceAsc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductFilter {
    /// Matched against name and category, case-insensitively.
    pub keyword: Option<String>,
    pub max_price: Option<i32>,
    pub sort: ProductSort,
    pub limit: i64,
}

impl Default for ProductFilter {
    fn default() -> Self {
        Self {
            keyword: None,
            max_price: None,
            sort: ProductSort::Rating,
            limit: 10,
        }
    }
}

impl ProductFilter {
    /// In-process form of the SQL predicate, shared by non-SQL catalogs.
    pub fn matches(&self, p: &Product) -> bool {
        if !p.is_available {
            return false;
        }
        if self.max_price.is_some_and(|max| p.price > max) {
            return false;
        }
        match &self.keyword {
            Some(k) => {
                let k = k.to_lowercase();
                p.name.to_lowercase().contains(&k) || p.category.to_lowercase().contains(&k)
            }
            None => true,
        }
    }
}

#[async_trait]
pub trait ProductCatalog: Send + Sync {
    async fn search(&self, filter: &ProductFilter) -> anyhow::Result<Vec<Product>>;
}

#[derive(Clone)]
pub struct PgCatalog {
    db: PgPool,
}

impl PgCatalog {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ProductCatalog for PgCatalog {
    async fn search(&self, filter: &ProductFilter) -> anyhow::Result<Vec<Product>> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
            r#"
            SELECT id, name, category, food_type, price, image, shop_name,
                   rating_average, rating_count, is_available
            FROM products
            WHERE is_available
            "#,
        );
        if let Some(k) = &filter.keyword {
            let pattern = format!("%{}%", k.replace('%', "\\%").replace('_', "\\_"));
            qb.push(" AND (name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR category ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
        if let Some(max) = filter.max_price {
            qb.push(" AND price <= ").push_bind(max);
        }
        qb.push(match filter.sort {
            ProductSort::Rating => " ORDER BY rating_average DESC, rating_count DESC, name",
            ProductSort::PriceAsc => " ORDER BY price ASC, rating_average DESC",
        });
        qb.push(" LIMIT ").push_bind(filter.limit);

        let rows = qb.build_query_as::<Product>().fetch_all(&self.db).await?;
        Ok(rows)
    }
}

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::repo::Product;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatRequest {
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShopRef {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rating {
    pub average: f64,
    pub count: i32,
}

/// Product as the storefront renders it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductCard {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
    pub category: String,
    pub food_type: String,
    pub price: i32,
    pub image: Option<String>,
    pub shop: ShopRef,
    pub rating: Rating,
}

impl From<Product> for ProductCard {
    fn from(p: Product) -> Self {
        Self {
            id: p.id,
            name: p.name,
            category: p.category,
            food_type: p.food_type,
            price: p.price,
            image: p.image,
            shop: ShopRef { name: p.shop_name },
            rating: Rating {
                average: p.rating_average,
                count: p.rating_count,
            },
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatReply {
    pub message: String,
    pub products: Vec<ProductCard>,
    pub recommendations: Vec<ProductCard>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<ChatReply>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ChatResponse {
    pub fn ok(reply: ChatReply) -> Self {
        Self {
            success: true,
            data: Some(reply),
            message: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message.into()),
        }
    }
}

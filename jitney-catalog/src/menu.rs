use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A food/drink item offered on board. Prices are in minor currency units.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub unit_price: i32,
    pub is_available: bool,
}

impl MenuItem {
    pub fn new(name: impl Into<String>, unit_price: i32) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: None,
            unit_price,
            is_available: true,
        }
    }
}

/// Repository trait for menu item access
#[async_trait]
pub trait MenuRepository: Send + Sync {
    async fn get_item(
        &self,
        id: Uuid,
    ) -> Result<Option<MenuItem>, Box<dyn std::error::Error + Send + Sync>>;

    async fn list_items(
        &self,
    ) -> Result<Vec<MenuItem>, Box<dyn std::error::Error + Send + Sync>>;

    async fn upsert_item(
        &self,
        item: &MenuItem,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

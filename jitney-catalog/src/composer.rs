use crate::menu::MenuRepository;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// One requested menu item for a booking.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderLineRequest {
    pub menu_item_id: Uuid,
    pub quantity: i32,
    pub instructions: Option<String>,
}

/// A priced line attached to a booking.
///
/// Name and unit price are snapshotted at compose time. Later edits to the
/// menu item must not change what an existing booking is charged.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrderLine {
    pub menu_item_id: Uuid,
    pub name: String,
    pub unit_price: i32,
    pub quantity: i32,
    pub instructions: Option<String>,
}

impl OrderLine {
    pub fn subtotal(&self) -> i32 {
        self.unit_price * self.quantity
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ComposeError {
    #[error("Unknown menu item: {0}")]
    InvalidMenuItem(Uuid),

    #[error("Menu item not available: {0}")]
    ItemUnavailable(String),

    #[error("Invalid quantity {quantity} for menu item {menu_item_id}")]
    InvalidQuantity { menu_item_id: Uuid, quantity: i32 },

    #[error("Menu lookup failed: {0}")]
    Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Builds the set of order lines for a booking.
pub struct OrderComposer {
    menu: Arc<dyn MenuRepository>,
}

impl OrderComposer {
    pub fn new(menu: Arc<dyn MenuRepository>) -> Self {
        Self { menu }
    }

    /// Resolve the requested items into priced lines.
    ///
    /// The result is the booking's complete line set: composing again for an
    /// existing booking replaces all previous lines, never merges into them.
    /// Callers editing a booking must therefore resend every line they want
    /// to keep.
    pub async fn compose(
        &self,
        requests: &[OrderLineRequest],
    ) -> Result<Vec<OrderLine>, ComposeError> {
        let mut lines = Vec::with_capacity(requests.len());

        for request in requests {
            if request.quantity < 1 {
                return Err(ComposeError::InvalidQuantity {
                    menu_item_id: request.menu_item_id,
                    quantity: request.quantity,
                });
            }

            let item = self
                .menu
                .get_item(request.menu_item_id)
                .await
                .map_err(ComposeError::Store)?
                .ok_or(ComposeError::InvalidMenuItem(request.menu_item_id))?;

            if !item.is_available {
                return Err(ComposeError::ItemUnavailable(item.name));
            }

            lines.push(OrderLine {
                menu_item_id: item.id,
                name: item.name,
                unit_price: item.unit_price,
                quantity: request.quantity,
                instructions: request.instructions.clone(),
            });
        }

        Ok(lines)
    }

    /// Sum of unit_price * quantity over the lines. Pure, no side effects.
    pub fn total(lines: &[OrderLine]) -> i32 {
        lines.iter().map(OrderLine::subtotal).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::menu::MenuItem;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct FixedMenu {
        items: Mutex<HashMap<Uuid, MenuItem>>,
    }

    impl FixedMenu {
        fn with(items: Vec<MenuItem>) -> Arc<Self> {
            Arc::new(Self {
                items: Mutex::new(items.into_iter().map(|i| (i.id, i)).collect()),
            })
        }
    }

    #[async_trait]
    impl MenuRepository for FixedMenu {
        async fn get_item(
            &self,
            id: Uuid,
        ) -> Result<Option<MenuItem>, Box<dyn std::error::Error + Send + Sync>> {
            Ok(self.items.lock().unwrap().get(&id).cloned())
        }

        async fn list_items(
            &self,
        ) -> Result<Vec<MenuItem>, Box<dyn std::error::Error + Send + Sync>> {
            Ok(self.items.lock().unwrap().values().cloned().collect())
        }

        async fn upsert_item(
            &self,
            item: &MenuItem,
        ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
            self.items.lock().unwrap().insert(item.id, item.clone());
            Ok(())
        }
    }

    fn request(item: &MenuItem, quantity: i32) -> OrderLineRequest {
        OrderLineRequest {
            menu_item_id: item.id,
            quantity,
            instructions: None,
        }
    }

    #[tokio::test]
    async fn compose_snapshots_name_and_price() {
        let burger = MenuItem::new("Burger", 800);
        let menu = FixedMenu::with(vec![burger.clone()]);
        let composer = OrderComposer::new(menu.clone());

        let lines = composer.compose(&[request(&burger, 2)]).await.unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].unit_price, 800);
        assert_eq!(OrderComposer::total(&lines), 1600);

        // Raising the menu price afterwards must not affect composed lines.
        let mut pricier = burger.clone();
        pricier.unit_price = 999;
        menu.upsert_item(&pricier).await.unwrap();

        assert_eq!(lines[0].unit_price, 800);
        assert_eq!(OrderComposer::total(&lines), 1600);
    }

    #[tokio::test]
    async fn compose_rejects_unknown_item() {
        let composer = OrderComposer::new(FixedMenu::with(vec![]));
        let missing = Uuid::new_v4();
        let result = composer
            .compose(&[OrderLineRequest {
                menu_item_id: missing,
                quantity: 1,
                instructions: None,
            }])
            .await;

        assert!(matches!(result, Err(ComposeError::InvalidMenuItem(id)) if id == missing));
    }

    #[tokio::test]
    async fn compose_rejects_unavailable_item() {
        let mut tea = MenuItem::new("Iced Tea", 300);
        tea.is_available = false;
        let composer = OrderComposer::new(FixedMenu::with(vec![tea.clone()]));

        let result = composer.compose(&[request(&tea, 1)]).await;
        assert!(matches!(result, Err(ComposeError::ItemUnavailable(name)) if name == "Iced Tea"));
    }

    #[tokio::test]
    async fn compose_rejects_non_positive_quantity() {
        let burger = MenuItem::new("Burger", 800);
        let composer = OrderComposer::new(FixedMenu::with(vec![burger.clone()]));

        for quantity in [0, -3] {
            let result = composer.compose(&[request(&burger, quantity)]).await;
            assert!(matches!(
                result,
                Err(ComposeError::InvalidQuantity { quantity: q, .. }) if q == quantity
            ));
        }
    }

    #[test]
    fn total_is_sum_over_lines() {
        let lines = vec![
            OrderLine {
                menu_item_id: Uuid::new_v4(),
                name: "Burger".into(),
                unit_price: 800,
                quantity: 2,
                instructions: None,
            },
            OrderLine {
                menu_item_id: Uuid::new_v4(),
                name: "Iced Tea".into(),
                unit_price: 300,
                quantity: 3,
                instructions: None,
            },
        ];
        assert_eq!(OrderComposer::total(&lines), 1600 + 900);
        assert_eq!(OrderComposer::total(&[]), 0);
    }
}

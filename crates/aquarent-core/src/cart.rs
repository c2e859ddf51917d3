use serde::{Deserialize, Serialize};
use tracing::debug;

/// How a cart line is paid for. The same purifier can sit in the cart twice,
/// once bought outright and once on a rental plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PurchasePlan {
    Purchase,
    Rental { months: u16 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: String,
    pub name: String,
    /// Price per unit in minor currency units (paise).
    pub unit_price: u64,
    pub quantity: u32,
    pub plan: PurchasePlan,
}

impl CartLine {
    #[must_use]
    pub fn key(&self) -> CartKey {
        CartKey {
            product_id: self.product_id.clone(),
            plan: self.plan,
        }
    }

    #[must_use]
    pub fn subtotal(&self) -> u64 {
        self.unit_price.saturating_mul(u64::from(self.quantity))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CartKey {
    pub product_id: String,
    pub plan: PurchasePlan,
}

impl CartKey {
    pub fn new(product_id: impl Into<String>, plan: PurchasePlan) -> Self {
        Self {
            product_id: product_id.into(),
            plan,
        }
    }
}

#[derive(Debug, Clone)]
pub enum CartAction {
    Add(CartLine),
    Remove(CartKey),
    SetQuantity { key: CartKey, quantity: u32 },
    Increment(CartKey),
    Decrement(CartKey),
    /// Replaces local state with the server's view of the cart.
    Replace(Vec<CartLine>),
    Clear,
}

/// Client-side cart. Lines keep insertion order, keys are unique and no
/// line ever has a quantity of zero.
///
/// Serialized as a plain list of lines; decoding goes through
/// `CartAction::Replace` so cached or server carts are normalized.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<CartLine>", into = "Vec<CartLine>")]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl From<Vec<CartLine>> for Cart {
    fn from(lines: Vec<CartLine>) -> Self {
        Self::new().reduce(CartAction::Replace(lines))
    }
}

impl From<Cart> for Vec<CartLine> {
    fn from(cart: Cart) -> Self {
        cart.lines
    }
}

impl Cart {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    #[must_use]
    pub fn line(&self, key: &CartKey) -> Option<&CartLine> {
        self.position(key).map(|index| &self.lines[index])
    }

    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.lines.iter().map(|line| u64::from(line.quantity)).sum()
    }

    #[must_use]
    pub fn total(&self) -> u64 {
        self.lines
            .iter()
            .fold(0u64, |total, line| total.saturating_add(line.subtotal()))
    }

    /// Consumes the cart and returns the next state.
    #[must_use]
    pub fn reduce(mut self, action: CartAction) -> Self {
        self.apply(action);
        self
    }

    pub fn apply(&mut self, action: CartAction) {
        match action {
            CartAction::Add(line) => self.add(line),
            CartAction::Remove(key) => {
                self.lines
                    .retain(|line| line.product_id != key.product_id || line.plan != key.plan);
            }
            CartAction::SetQuantity { key, quantity } => self.set_quantity(&key, quantity),
            CartAction::Increment(key) => match self.position(&key) {
                Some(index) => {
                    let line = &mut self.lines[index];
                    line.quantity = line.quantity.saturating_add(1);
                }
                None => debug!(product_id = %key.product_id, "increment on missing cart line"),
            },
            CartAction::Decrement(key) => match self.position(&key) {
                Some(index) => {
                    let quantity = self.lines[index].quantity.saturating_sub(1);
                    self.set_quantity(&key, quantity);
                }
                None => debug!(product_id = %key.product_id, "decrement on missing cart line"),
            },
            CartAction::Replace(lines) => {
                self.lines.clear();
                for line in lines {
                    self.add(line);
                }
            }
            CartAction::Clear => self.lines.clear(),
        }
    }

    fn add(&mut self, line: CartLine) {
        if line.quantity == 0 {
            return;
        }
        match self.position(&line.key()) {
            Some(index) => {
                let existing = &mut self.lines[index];
                existing.quantity = existing.quantity.saturating_add(line.quantity);
                existing.unit_price = line.unit_price;
                existing.name = line.name;
            }
            None => self.lines.push(line),
        }
    }

    fn set_quantity(&mut self, key: &CartKey, quantity: u32) {
        let Some(index) = self.position(key) else {
            return;
        };
        if quantity == 0 {
            self.lines.remove(index);
        } else {
            self.lines[index].quantity = quantity;
        }
    }

    fn position(&self, key: &CartKey) -> Option<usize> {
        self.lines
            .iter()
            .position(|line| line.product_id == key.product_id && line.plan == key.plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(product_id: &str, plan: PurchasePlan, unit_price: u64, quantity: u32) -> CartLine {
        CartLine {
            product_id: product_id.to_string(),
            name: format!("Purifier {product_id}"),
            unit_price,
            quantity,
            plan,
        }
    }

    #[test]
    fn add_merges_same_product_and_plan() {
        let cart = Cart::new()
            .reduce(CartAction::Add(line("ro-1", PurchasePlan::Purchase, 15_000, 1)))
            .reduce(CartAction::Add(line("ro-1", PurchasePlan::Purchase, 14_000, 2)));
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.lines()[0].quantity, 3);
        assert_eq!(cart.lines()[0].unit_price, 14_000);
    }

    #[test]
    fn rental_and_purchase_lines_are_distinct() {
        let cart = Cart::new()
            .reduce(CartAction::Add(line("ro-1", PurchasePlan::Purchase, 15_000, 1)))
            .reduce(CartAction::Add(line(
                "ro-1",
                PurchasePlan::Rental { months: 12 },
                499,
                1,
            )));
        assert_eq!(cart.lines().len(), 2);
        assert_eq!(cart.total(), 15_499);
        assert_eq!(cart.item_count(), 2);
    }

    #[test]
    fn decrement_to_zero_removes_line() {
        let key = CartKey::new("uv-2", PurchasePlan::Purchase);
        let cart = Cart::new()
            .reduce(CartAction::Add(line("uv-2", PurchasePlan::Purchase, 900, 1)))
            .reduce(CartAction::Increment(key.clone()))
            .reduce(CartAction::Decrement(key.clone()))
            .reduce(CartAction::Decrement(key.clone()));
        assert!(cart.is_empty());
        assert!(cart.line(&key).is_none());
    }

    #[test]
    fn set_quantity_zero_removes_and_missing_key_is_ignored() {
        let key = CartKey::new("uv-2", PurchasePlan::Purchase);
        let mut cart = Cart::new().reduce(CartAction::Add(line(
            "uv-2",
            PurchasePlan::Purchase,
            900,
            4,
        )));
        cart.apply(CartAction::SetQuantity {
            key: CartKey::new("missing", PurchasePlan::Purchase),
            quantity: 3,
        });
        assert_eq!(cart.item_count(), 4);
        cart.apply(CartAction::SetQuantity { key, quantity: 0 });
        assert!(cart.is_empty());
    }

    #[test]
    fn replace_merges_duplicates_and_drops_empty_lines() {
        let cart = Cart::new()
            .reduce(CartAction::Add(line("old", PurchasePlan::Purchase, 1, 1)))
            .reduce(CartAction::Replace(vec![
                line("a", PurchasePlan::Purchase, 100, 1),
                line("a", PurchasePlan::Purchase, 100, 2),
                line("b", PurchasePlan::Purchase, 50, 0),
            ]));
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.lines()[0].quantity, 3);
        assert_eq!(cart.total(), 300);
    }

    #[test]
    fn remove_and_clear() {
        let cart = Cart::new()
            .reduce(CartAction::Add(line("a", PurchasePlan::Purchase, 100, 1)))
            .reduce(CartAction::Add(line("b", PurchasePlan::Purchase, 100, 1)))
            .reduce(CartAction::Remove(CartKey::new("a", PurchasePlan::Purchase)));
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.lines()[0].product_id, "b");
        assert!(cart.reduce(CartAction::Clear).is_empty());
    }

    #[test]
    fn decoding_normalizes_lines() {
        let cart: Cart = serde_json::from_value(serde_json::json!([
            {"productId": "a", "name": "A", "unitPrice": 100, "quantity": 1, "plan": {"type": "purchase"}},
            {"productId": "a", "name": "A", "unitPrice": 100, "quantity": 2, "plan": {"type": "purchase"}},
            {"productId": "b", "name": "B", "unitPrice": 50, "quantity": 0, "plan": {"type": "purchase"}}
        ]))
        .expect("decode");
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.item_count(), 3);

        let encoded = serde_json::to_value(&cart).expect("encode");
        assert_eq!(encoded.as_array().map(Vec::len), Some(1));
    }

    #[test]
    fn plan_serializes_with_tag() {
        let json = serde_json::to_value(PurchasePlan::Rental { months: 6 }).expect("encode");
        assert_eq!(json, serde_json::json!({"type": "rental", "months": 6}));
    }
}

use chrono::{DateTime, Utc};
use common::{Money, ProductId, UserId};
use serde::{Deserialize, Serialize};

/// A single cart entry, priced at the moment it was added.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
    pub price_at_add: Money,
    pub added_at: DateTime<Utc>,
}

impl CartLine {
    pub fn new(
        product_id: ProductId,
        product_name: impl Into<String>,
        quantity: u32,
        price_at_add: Money,
    ) -> Self {
        Self {
            product_id,
            product_name: product_name.into(),
            quantity,
            price_at_add,
            added_at: Utc::now(),
        }
    }

    /// Line total at the captured price.
    pub fn line_total(&self) -> Money {
        self.price_at_add.multiply(self.quantity)
    }
}

/// A user's shopping cart.
///
/// The total is never stored; it is recomputed from the lines on demand
/// so a stale cached figure can never disagree with the contents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cart {
    pub user_id: UserId,
    pub items: Vec<CartLine>,
    pub updated_at: DateTime<Utc>,
}

impl Cart {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            items: Vec::new(),
            updated_at: Utc::now(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn find(&self, product_id: &ProductId) -> Option<&CartLine> {
        self.items.iter().find(|l| &l.product_id == product_id)
    }

    /// Total across all lines at their captured prices.
    pub fn total_amount(&self) -> Money {
        self.items.iter().map(CartLine::line_total).sum()
    }

    /// Adds a line, merging quantities if the product is already present.
    /// A merge keeps the original captured price.
    pub fn upsert(&mut self, line: CartLine) {
        match self
            .items
            .iter_mut()
            .find(|l| l.product_id == line.product_id)
        {
            Some(existing) => existing.quantity += line.quantity,
            None => self.items.push(line),
        }
        self.updated_at = Utc::now();
    }

    /// Sets a line's quantity; zero removes the line. Returns `false`
    /// when the product is not in the cart.
    pub fn set_quantity(&mut self, product_id: &ProductId, quantity: u32) -> bool {
        if quantity == 0 {
            return self.remove(product_id);
        }
        match self
            .items
            .iter_mut()
            .find(|l| &l.product_id == product_id)
        {
            Some(line) => {
                line.quantity = quantity;
                self.updated_at = Utc::now();
                true
            }
            None => false,
        }
    }

    /// Removes a line; returns `false` when the product is not in the cart.
    pub fn remove(&mut self, product_id: &ProductId) -> bool {
        let before = self.items.len();
        self.items.retain(|l| &l.product_id != product_id);
        if self.items.len() < before {
            self.updated_at = Utc::now();
            true
        } else {
            false
        }
    }
}

//! Shopping cart for the cashier area

use chrono::{Local, SubsecRound};

use crate::error::{Error, Result};
use crate::models::{Product, Sale, SaleItem};
use crate::money::{format_money, out_of_range, price_with_tax};

/// One product in the cart
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartLine {
    pub product_id: i64,
    pub name: String,
    pub price: i64,
    pub price_with_tax: i64,
    pub quantity: i64,
    /// Stock known when the product was added
    pub stock: i64,
}

impl CartLine {
    /// Taxed price times quantity. [`Cart`] only holds lines whose
    /// subtotal fits in an `i64`.
    pub fn subtotal(&self) -> i64 {
        self.price_with_tax.saturating_mul(self.quantity)
    }

    fn to_item(&self) -> SaleItem {
        SaleItem {
            product_id: self.product_id,
            name: self.name.clone(),
            price: self.price,
            price_with_tax: self.price_with_tax,
            quantity: self.quantity,
            subtotal: self.subtotal(),
        }
    }
}

/// Products being rung up, in insertion order
#[derive(Debug, Clone, Default)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn line(&self, product_id: i64) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.product_id == product_id)
    }

    fn position(&self, product_id: i64) -> Option<usize> {
        self.lines.iter().position(|l| l.product_id == product_id)
    }

    /// Reject a line change that would push a subtotal or the total out of range
    fn check_amounts(&self, product_id: i64, price_with_tax: i64, quantity: i64) -> Result<()> {
        let subtotal = price_with_tax
            .checked_mul(quantity)
            .ok_or_else(out_of_range)?;
        self.lines
            .iter()
            .filter(|l| l.product_id != product_id)
            .try_fold(subtotal, |total, l| total.checked_add(l.subtotal()))
            .ok_or_else(out_of_range)?;
        Ok(())
    }

    /// Add `quantity` units, merging with an existing line for the same product
    pub fn add(&mut self, product: &Product, quantity: i64) -> Result<()> {
        if quantity <= 0 {
            return Err(Error::validation("La cantidad debe ser mayor a 0."));
        }
        let in_cart = self.line(product.id).map(|l| l.quantity).unwrap_or(0);
        let wanted = in_cart.checked_add(quantity).ok_or_else(out_of_range)?;
        if wanted > product.stock {
            return Err(Error::validation(format!(
                "No hay stock suficiente. Disponible: {} • En carrito: {} • Solicitado: {}",
                product.stock, in_cart, quantity
            )));
        }

        match self.position(product.id) {
            Some(idx) => {
                self.check_amounts(product.id, self.lines[idx].price_with_tax, wanted)?;
                self.lines[idx].quantity = wanted;
            }
            None => {
                let taxed = price_with_tax(product.price)?;
                self.check_amounts(product.id, taxed, quantity)?;
                self.lines.push(CartLine {
                    product_id: product.id,
                    name: product.name.clone(),
                    price: product.price,
                    price_with_tax: taxed,
                    quantity,
                    stock: product.stock,
                });
            }
        }
        Ok(())
    }

    /// Change a line's quantity by `delta`; the line goes away at zero or below
    pub fn adjust(&mut self, product_id: i64, delta: i64) -> Result<()> {
        let Some(idx) = self.position(product_id) else {
            return Err(Error::validation("El producto no está en el carrito."));
        };
        let new_quantity = self.lines[idx]
            .quantity
            .checked_add(delta)
            .ok_or_else(out_of_range)?;
        if new_quantity <= 0 {
            self.lines.remove(idx);
            return Ok(());
        }
        if new_quantity > self.lines[idx].stock {
            return Err(Error::validation(format!(
                "Stock disponible: {}",
                self.lines[idx].stock
            )));
        }
        self.check_amounts(product_id, self.lines[idx].price_with_tax, new_quantity)?;
        self.lines[idx].quantity = new_quantity;
        Ok(())
    }

    /// Remove a line; `false` when the product was not in the cart
    pub fn remove(&mut self, product_id: i64) -> bool {
        match self.position(product_id) {
            Some(idx) => {
                self.lines.remove(idx);
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Sum of all subtotals, tax included
    pub fn total(&self) -> i64 {
        self.lines.iter().map(CartLine::subtotal).sum()
    }

    /// `Total: $12.345`
    pub fn total_label(&self) -> String {
        format!("Total: {}", format_money(self.total()))
    }

    /// Snapshot the cart as a sale rung up by `user`
    pub fn to_sale(&self, user: &str) -> Result<Sale> {
        if self.is_empty() {
            return Err(Error::validation("El carrito está vacío."));
        }
        Ok(Sale {
            timestamp: Local::now().naive_local().trunc_subsecs(0),
            user: user.to_string(),
            items: self.lines.iter().map(CartLine::to_item).collect(),
            total: self.total(),
        })
    }
}

use anyhow::{bail, Result};
use cloudpos_client::categories::CategoryEvent;
use cloudpos_client::money::{format_money, price_with_tax};
use cloudpos_client::products::ProductEvent;

#[tokio::main]
async fn main() -> Result<()> {
    let pos = cloudpos_demos::init()?;
    cloudpos_demos::sign_in(&pos).await?;

    let (categories, mut category_events) = pos.categories();
    categories.load();
    while let Some(event) = category_events.recv().await {
        match event {
            CategoryEvent::Busy(busy) => log::debug!("categories busy: {}", busy),
            CategoryEvent::Loaded(items) => {
                println!("Categorías ({}):", items.len());
                for category in items {
                    println!("  [{}] {}", category.id, category.name);
                }
                break;
            }
            CategoryEvent::Error(message) => bail!("no se pudieron cargar las categorías: {}", message),
            other => log::debug!("ignored {:?}", other),
        }
    }

    let (products, mut product_events) = pos.products();
    products.load();
    while let Some(event) = product_events.recv().await {
        match event {
            ProductEvent::Busy(busy) => log::debug!("products busy: {}", busy),
            ProductEvent::Loaded(items) => {
                println!("Productos ({}):", items.len());
                for product in items {
                    let taxed = price_with_tax(product.price)
                        .map(format_money)
                        .unwrap_or_else(|_| "-".to_string());
                    println!(
                        "  [{}] {:<30} {:>12} {:>12}  stock {}",
                        product.id,
                        product.name,
                        format_money(product.price),
                        taxed,
                        product.stock
                    );
                }
                break;
            }
            ProductEvent::Error(message) => bail!("no se pudieron cargar los productos: {}", message),
            other => log::debug!("ignored {:?}", other),
        }
    }

    Ok(())
}

// Sample wardrobe for first-run demos
use chrono::{DateTime, Utc};
use std::path::Path;

use crate::state::{Category, ClothingItem, DbResult, ImageStore, ItemRepository};

/// Four starter items whose photos are remote product images
pub fn sample_wardrobe(now: DateTime<Utc>) -> Vec<ClothingItem> {
    let sample = |id: &str, name: &str, category: Category, color: &str, image: &str| {
        ClothingItem {
            id: id.to_string(),
            name: name.to_string(),
            category,
            color: color.to_string(),
            image_path: image.to_string(),
            date_added: now,
            tags: Vec::new(),
        }
    };

    vec![
        sample(
            "1",
            "Blue Shirt",
            Category::Tops,
            "blue",
            "https://m.media-amazon.com/images/I/519-6fgzdQL._UY1000_.jpg",
        ),
        sample(
            "2",
            "White T-Shirt",
            Category::Tops,
            "white",
            "https://m.media-amazon.com/images/I/41uF42-1WwL._UY1000_.jpg",
        ),
        sample(
            "3",
            "Shorts",
            Category::Bottoms,
            "black",
            "https://m.media-amazon.com/images/I/618l+TYkF3L._AC_SX679_.jpg",
        ),
        sample(
            "4",
            "Fishing Short",
            Category::Bottoms,
            "beige",
            "https://m.media-amazon.com/images/I/51ZoGBlWEgL._AC_SX679_.jpg",
        ),
    ]
}

/// Replace every stored item with `seed`, deleting the photos of the removed
/// items. Outfits are left untouched.
///
/// Returns the number of items removed.
pub async fn reset_wardrobe(
    items: &ItemRepository,
    images: &ImageStore,
    seed: &[ClothingItem],
) -> DbResult<usize> {
    let existing = items.list()?;
    for item in &existing {
        items.remove(&item.id)?;
        if let Err(e) = images.remove(Path::new(&item.image_path)).await {
            log::warn!("Item {} removed but image {} remains: {}", item.id, item.image_path, e);
        }
    }

    for item in seed {
        items.add(item)?;
        log::info!("Added {} to wardrobe", item.name);
    }

    Ok(existing.len())
}

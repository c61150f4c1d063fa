// Commands invoked by the presentation layer
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::seed;
use crate::state::{
    self, image_filename, Category, ClothingItem, DbConnection, ImageStore, ItemRepository,
    Outfit, OutfitItemSnapshot, OutfitRepository, TableInfo,
};

#[derive(Debug, Serialize)]
pub struct CommandError {
    message: String,
}

impl CommandError {
    fn new(message: impl Into<String>) -> Self {
        CommandError {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl<E: std::fmt::Display> From<E> for CommandError {
    fn from(error: E) -> Self {
        CommandError {
            message: error.to_string(),
        }
    }
}

type CommandResult<T> = Result<T, CommandError>;

/// Everything the commands need, built once at startup and shared by reference
#[derive(Clone)]
pub struct AppState {
    pub db: DbConnection,
    pub items: ItemRepository,
    pub outfits: OutfitRepository,
    pub images: ImageStore,
}

impl AppState {
    pub fn new(db: DbConnection, images: ImageStore) -> Self {
        Self {
            items: ItemRepository::new(db.clone()),
            outfits: OutfitRepository::new(db.clone()),
            db,
            images,
        }
    }

    /// Open the on-disk store described by `config`
    pub fn open(config: &AppConfig) -> Result<Self, state::DbError> {
        let db = state::init_db(config)?;
        Ok(Self::new(db, ImageStore::new(config.image_dir())))
    }
}

/// Asked before anything is deleted
pub trait Confirm {
    fn confirm(&self, prompt: &str) -> bool;
}

impl<F: Fn(&str) -> bool> Confirm for F {
    fn confirm(&self, prompt: &str) -> bool {
        self(prompt)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Deletion {
    Removed,
    Cancelled,
    NotFound,
}

// ==================== SCHEMA COMMANDS ====================

pub fn describe_schema(state: &AppState) -> CommandResult<Vec<TableInfo>> {
    state::describe_schema(&state.db).map_err(CommandError::from)
}

// ==================== ITEM COMMANDS ====================

#[derive(Debug, Deserialize)]
pub struct CreateItemInput {
    pub name: String,
    pub category: Category,
    pub color: String,
    pub source_path: PathBuf,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Store the picked photo, then record the item that points at it
pub async fn create_item(state: &AppState, input: CreateItemInput) -> CommandResult<ClothingItem> {
    if input.name.trim().is_empty() {
        return Err(CommandError::new("Please provide a name for the item"));
    }

    let id = Uuid::new_v4().to_string();
    let filename = image_filename(&id, &input.source_path);

    // The record must never reference an image that failed to persist
    let image_path = state
        .images
        .save(&input.source_path, &filename)
        .await
        .map_err(|e| CommandError::new(format!("Failed to save image: {}", e)))?;

    let item = ClothingItem {
        id,
        name: input.name.trim().to_string(),
        category: input.category,
        color: input.color.trim().to_string(),
        image_path: image_path.to_string_lossy().to_string(),
        date_added: Utc::now(),
        tags: input.tags,
    };

    if let Err(e) = state.items.add(&item) {
        log::error!("Failed to insert item {}: {}", item.id, e);
        if let Err(cleanup) = state.images.remove(&image_path).await {
            log::warn!("Failed to remove orphaned image {}: {}", image_path.display(), cleanup);
        }
        return Err(CommandError::from(e));
    }

    log::info!("Added {} '{}' to wardrobe", item.category, item.name);
    Ok(item)
}

pub fn list_items(state: &AppState, category: Option<Category>) -> CommandResult<Vec<ClothingItem>> {
    let items = match category {
        Some(category) => state.items.list_by_category(category)?,
        None => state.items.list()?,
    };
    Ok(items)
}

/// Delete an item and its stored photo once the user agrees
pub async fn delete_item(
    state: &AppState,
    id: &str,
    confirm: &dyn Confirm,
) -> CommandResult<Deletion> {
    let Some(item) = state.items.get(id)? else {
        return Ok(Deletion::NotFound);
    };

    let prompt = format!("Are you sure you want to delete {}?", item.name);
    if !confirm.confirm(&prompt) {
        log::debug!("Deletion of item {} cancelled", id);
        return Ok(Deletion::Cancelled);
    }

    state.items.remove(id)?;

    // The row is gone either way; an undeletable file is only worth a warning
    let image_path = PathBuf::from(&item.image_path);
    if let Err(e) = state.images.remove(&image_path).await {
        log::warn!("Item {} deleted but image {} remains: {}", id, item.image_path, e);
    }

    log::info!("Deleted item {}", id);
    Ok(Deletion::Removed)
}

// ==================== OUTFIT COMMANDS ====================

#[derive(Debug, Deserialize)]
pub struct CreateOutfitInput {
    pub name: String,
    pub item_ids: Vec<String>,
    pub image_preview: Option<String>,
}

/// Bundle the selected items into a new outfit, copying their current data
pub async fn create_outfit(state: &AppState, input: CreateOutfitInput) -> CommandResult<Outfit> {
    if input.name.trim().is_empty() {
        return Err(CommandError::new("Please provide a name for the outfit"));
    }
    if input.item_ids.is_empty() {
        return Err(CommandError::new("Please select at least one item"));
    }

    let mut items = Vec::with_capacity(input.item_ids.len());
    for id in &input.item_ids {
        let item = state
            .items
            .get(id)?
            .ok_or_else(|| CommandError::new(format!("Item not found: {}", id)))?;
        items.push(OutfitItemSnapshot::from(item));
    }

    let outfit = Outfit {
        id: Uuid::new_v4().to_string(),
        name: input.name.trim().to_string(),
        items,
        created_date: Utc::now(),
        image_preview: input.image_preview.filter(|p| !p.is_empty()),
    };

    state.outfits.add(&outfit)?;

    log::info!("Created outfit '{}' with {} items", outfit.name, outfit.items.len());
    Ok(outfit)
}

pub fn list_outfits(state: &AppState) -> CommandResult<Vec<Outfit>> {
    state.outfits.list().map_err(CommandError::from)
}

pub async fn delete_outfit(
    state: &AppState,
    id: &str,
    confirm: &dyn Confirm,
) -> CommandResult<Deletion> {
    let Some(outfit) = state.outfits.get(id)? else {
        return Ok(Deletion::NotFound);
    };

    let prompt = format!("Are you sure you want to delete {}?", outfit.name);
    if !confirm.confirm(&prompt) {
        return Ok(Deletion::Cancelled);
    }

    state.outfits.remove(id)?;
    log::info!("Deleted outfit {}", id);
    Ok(Deletion::Removed)
}

// ==================== SEED COMMANDS ====================

/// Replace the whole wardrobe with the sample items once the user agrees.
///
/// Returns the number of items removed, or `None` when cancelled.
pub async fn seed_wardrobe(state: &AppState, confirm: &dyn Confirm) -> CommandResult<Option<usize>> {
    let count = state.items.count()?;
    let prompt = format!(
        "Replace all {} items and their photos with the sample wardrobe?",
        count
    );
    if !confirm.confirm(&prompt) {
        log::debug!("Seeding cancelled");
        return Ok(None);
    }

    let sample = seed::sample_wardrobe(Utc::now());
    let removed = seed::reset_wardrobe(&state.items, &state.images, &sample).await?;
    log::info!("Removed {} existing items", removed);
    Ok(Some(removed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (TempDir, AppState) {
        let tmp = TempDir::new().unwrap();
        let config = AppConfig::with_data_dir(tmp.path().join("data"));
        let state = AppState::open(&config).unwrap();
        (tmp, state)
    }

    fn photo(tmp: &TempDir, name: &str) -> PathBuf {
        let path = tmp.path().join(name);
        std::fs::write(&path, format!("pixels of {}", name)).unwrap();
        path
    }

    fn shirt_input(source_path: PathBuf) -> CreateItemInput {
        CreateItemInput {
            name: "Blue Shirt".to_string(),
            category: Category::Tops,
            color: "blue".to_string(),
            source_path,
            tags: vec!["work".to_string()],
        }
    }

    #[tokio::test]
    async fn test_create_item_stores_image_then_record() {
        let (tmp, state) = setup();
        let source = photo(&tmp, "IMG_0001.jpg");

        let item = create_item(&state, shirt_input(source.clone())).await.unwrap();

        let stored = PathBuf::from(&item.image_path);
        assert!(stored.starts_with(state.images.dir()));
        assert_eq!(std::fs::read(&stored).unwrap(), std::fs::read(&source).unwrap());
        assert_eq!(list_items(&state, None).unwrap(), vec![item]);
    }

    #[tokio::test]
    async fn test_create_item_with_unreadable_image_writes_nothing() {
        let (tmp, state) = setup();

        let err = create_item(&state, shirt_input(tmp.path().join("gone.jpg")))
            .await
            .unwrap_err();

        assert!(err.message().contains("Failed to save image"));
        assert!(list_items(&state, None).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_item_requires_name() {
        let (tmp, state) = setup();
        let mut input = shirt_input(photo(&tmp, "a.jpg"));
        input.name = "   ".to_string();

        assert!(create_item(&state, input).await.is_err());
        assert_eq!(state.items.count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_item_cancelled_keeps_everything() {
        let (tmp, state) = setup();
        let item = create_item(&state, shirt_input(photo(&tmp, "a.jpg"))).await.unwrap();

        let outcome = delete_item(&state, &item.id, &|_: &str| false).await.unwrap();

        assert_eq!(outcome, Deletion::Cancelled);
        assert!(state.items.get(&item.id).unwrap().is_some());
        assert!(PathBuf::from(&item.image_path).exists());
    }

    #[tokio::test]
    async fn test_delete_item_removes_record_and_image() {
        let (tmp, state) = setup();
        let item = create_item(&state, shirt_input(photo(&tmp, "a.jpg"))).await.unwrap();

        let outcome = delete_item(&state, &item.id, &|prompt: &str| {
            assert!(prompt.contains("Blue Shirt"));
            true
        })
        .await
        .unwrap();

        assert_eq!(outcome, Deletion::Removed);
        assert!(state.items.get(&item.id).unwrap().is_none());
        assert!(!PathBuf::from(&item.image_path).exists());

        let again = delete_item(&state, &item.id, &|_: &str| true).await.unwrap();
        assert_eq!(again, Deletion::NotFound);
    }

    #[tokio::test]
    async fn test_outfit_survives_item_deletion() {
        let (tmp, state) = setup();
        let shirt = create_item(&state, shirt_input(photo(&tmp, "shirt.jpg"))).await.unwrap();
        let shorts = create_item(
            &state,
            CreateItemInput {
                name: "Shorts".to_string(),
                category: Category::Bottoms,
                color: "black".to_string(),
                source_path: photo(&tmp, "shorts.png"),
                tags: vec![],
            },
        )
        .await
        .unwrap();

        let outfit = create_outfit(
            &state,
            CreateOutfitInput {
                name: "Casual".to_string(),
                item_ids: vec![shirt.id.clone(), shorts.id.clone()],
                image_preview: None,
            },
        )
        .await
        .unwrap();

        delete_item(&state, &shirt.id, &|_: &str| true).await.unwrap();

        let outfits = list_outfits(&state).unwrap();
        assert_eq!(outfits, vec![outfit]);
        assert_eq!(outfits[0].items[0], OutfitItemSnapshot::from(&shirt));
        assert_eq!(outfits[0].items[1].id, shorts.id);
    }

    #[tokio::test]
    async fn test_create_outfit_validation() {
        let (tmp, state) = setup();
        let shirt = create_item(&state, shirt_input(photo(&tmp, "a.jpg"))).await.unwrap();

        let no_name = CreateOutfitInput {
            name: "".to_string(),
            item_ids: vec![shirt.id.clone()],
            image_preview: None,
        };
        let no_items = CreateOutfitInput {
            name: "Casual".to_string(),
            item_ids: vec![],
            image_preview: None,
        };
        let unknown = CreateOutfitInput {
            name: "Casual".to_string(),
            item_ids: vec!["missing".to_string()],
            image_preview: None,
        };

        assert!(create_outfit(&state, no_name).await.is_err());
        assert!(create_outfit(&state, no_items).await.is_err());
        let err = create_outfit(&state, unknown).await.unwrap_err();
        assert!(err.message().contains("missing"));
        assert!(list_outfits(&state).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_outfit() {
        let (tmp, state) = setup();
        let shirt = create_item(&state, shirt_input(photo(&tmp, "a.jpg"))).await.unwrap();
        let outfit = create_outfit(
            &state,
            CreateOutfitInput {
                name: "Office".to_string(),
                item_ids: vec![shirt.id.clone()],
                image_preview: Some(shirt.image_path.clone()),
            },
        )
        .await
        .unwrap();

        assert_eq!(
            delete_outfit(&state, &outfit.id, &|_: &str| false).await.unwrap(),
            Deletion::Cancelled
        );
        assert_eq!(
            delete_outfit(&state, &outfit.id, &|_: &str| true).await.unwrap(),
            Deletion::Removed
        );
        assert!(list_outfits(&state).unwrap().is_empty());
        // Outfit deletion leaves the item and its photo alone
        assert!(PathBuf::from(&shirt.image_path).exists());
    }

    #[test]
    fn test_list_items_by_category() {
        let tmp = TempDir::new().unwrap();
        let state = AppState::new(
            state::open_in_memory().unwrap(),
            ImageStore::new(tmp.path().join("wardrobe")),
        );
        for (id, category) in [("1", Category::Tops), ("2", Category::Shoes)] {
            state
                .items
                .add(&ClothingItem {
                    id: id.to_string(),
                    name: format!("item {}", id),
                    category,
                    color: "grey".to_string(),
                    image_path: "/img".to_string(),
                    date_added: Utc::now(),
                    tags: vec![],
                })
                .unwrap();
        }

        let shoes = list_items(&state, Some(Category::Shoes)).unwrap();
        assert_eq!(shoes.len(), 1);
        assert_eq!(shoes[0].id, "2");
        assert_eq!(list_items(&state, None).unwrap().len(), 2);
    }

    #[test]
    fn test_describe_schema_command() {
        let tmp = TempDir::new().unwrap();
        let state = AppState::new(
            state::open_in_memory().unwrap(),
            ImageStore::new(tmp.path().join("wardrobe")),
        );
        let tables = describe_schema(&state).unwrap();
        assert_eq!(tables.len(), 2);
    }

    #[tokio::test]
    async fn test_seed_wardrobe_removes_created_photos() {
        let (tmp, state) = setup();
        let item = create_item(&state, shirt_input(photo(&tmp, "a.jpg"))).await.unwrap();
        let stored = PathBuf::from(&item.image_path);
        assert!(stored.exists());

        let removed = seed_wardrobe(&state, &|prompt: &str| {
            assert!(prompt.contains("1 items"));
            true
        })
        .await
        .unwrap();

        assert_eq!(removed, Some(1));
        assert!(!stored.exists());
        assert!(state.items.get(&item.id).unwrap().is_none());
        assert_eq!(state.items.count().unwrap(), 4);
    }

    #[tokio::test]
    async fn test_seed_wardrobe_cancelled_keeps_everything() {
        let (tmp, state) = setup();
        let item = create_item(&state, shirt_input(photo(&tmp, "a.jpg"))).await.unwrap();

        let removed = seed_wardrobe(&state, &|_: &str| false).await.unwrap();

        assert_eq!(removed, None);
        assert_eq!(list_items(&state, None).unwrap(), vec![item.clone()]);
        assert!(PathBuf::from(&item.image_path).exists());
    }
}

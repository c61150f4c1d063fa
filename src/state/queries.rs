// Database CRUD operations
use rusqlite::{params, OptionalExtension, Row};

use super::db::{DbConnection, DbError, DbResult};
use super::models::{
    format_timestamp, parse_timestamp, Category, ClothingItem, Outfit, OutfitItemSnapshot,
    UnknownCategory,
};

const ITEM_COLUMNS: &str = "id, name, category, color, imagePath, dateAdded, tags";
const OUTFIT_COLUMNS: &str = "id, name, items, createdDate, imagePreview";

/// Map a primary-key collision to `DuplicateId`, pass everything else through
fn insert_error(table: &'static str, id: &str, err: rusqlite::Error) -> DbError {
    match err {
        rusqlite::Error::SqliteFailure(ref e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY =>
        {
            DbError::DuplicateId {
                table,
                id: id.to_string(),
            }
        }
        other => other.into(),
    }
}

fn require_name(kind: &str, name: &str) -> DbResult<()> {
    if name.trim().is_empty() {
        return Err(DbError::Validation(format!("{} name must not be empty", kind)));
    }
    Ok(())
}

// ==================== ITEM QUERIES ====================

/// Raw `clothes` row before the text columns are decoded
struct ItemRow {
    id: String,
    name: String,
    category: String,
    color: String,
    image_path: String,
    date_added: String,
    tags: Option<String>,
}

impl ItemRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(ItemRow {
            id: row.get(0)?,
            name: row.get(1)?,
            category: row.get(2)?,
            color: row.get(3)?,
            image_path: row.get(4)?,
            date_added: row.get(5)?,
            tags: row.get(6)?,
        })
    }

    fn decode(self) -> DbResult<ClothingItem> {
        let invalid = |reason: String| DbError::InvalidRecord {
            table: "clothes",
            reason,
        };

        let category = self
            .category
            .parse::<Category>()
            .map_err(|e: UnknownCategory| invalid(format!("item {}: {}", self.id, e)))?;
        let date_added = parse_timestamp(&self.date_added)
            .map_err(|e| invalid(format!("item {}: bad dateAdded: {}", self.id, e)))?;
        let tags = match self.tags.as_deref() {
            None | Some("") => Vec::new(),
            Some(json) => serde_json::from_str::<Vec<String>>(json)
                .map_err(|e| invalid(format!("item {}: bad tags: {}", self.id, e)))?,
        };

        Ok(ClothingItem {
            id: self.id,
            name: self.name,
            category,
            color: self.color,
            image_path: self.image_path,
            date_added,
            tags,
        })
    }
}

/// Clothing items stored in the `clothes` table
#[derive(Clone)]
pub struct ItemRepository {
    db: DbConnection,
}

impl ItemRepository {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }

    /// Insert a new item. The caller supplies the id.
    pub fn add(&self, item: &ClothingItem) -> DbResult<()> {
        require_name("Item", &item.name)?;
        let tags = serde_json::to_string(&item.tags)?;

        let conn = self.db.lock();
        conn.execute(
            "INSERT INTO clothes (id, name, category, color, imagePath, dateAdded, tags)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                item.id,
                item.name,
                item.category.as_str(),
                item.color,
                item.image_path,
                format_timestamp(&item.date_added),
                tags,
            ],
        )
        .map_err(|e| insert_error("clothes", &item.id, e))?;

        log::debug!("Added item {} ({})", item.id, item.category);
        Ok(())
    }

    /// Get an item by ID
    pub fn get(&self, id: &str) -> DbResult<Option<ClothingItem>> {
        let conn = self.db.lock();
        let row = conn
            .query_row(
                &format!("SELECT {} FROM clothes WHERE id = ?1", ITEM_COLUMNS),
                [id],
                ItemRow::from_row,
            )
            .optional()?;

        row.map(ItemRow::decode).transpose()
    }

    /// All items, most recently added first
    pub fn list(&self) -> DbResult<Vec<ClothingItem>> {
        let conn = self.db.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM clothes ORDER BY dateAdded DESC, rowid DESC",
            ITEM_COLUMNS
        ))?;

        let rows = stmt
            .query_map([], ItemRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter().map(ItemRow::decode).collect()
    }

    /// Items of one category, most recently added first
    pub fn list_by_category(&self, category: Category) -> DbResult<Vec<ClothingItem>> {
        let conn = self.db.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM clothes WHERE category = ?1 ORDER BY dateAdded DESC, rowid DESC",
            ITEM_COLUMNS
        ))?;

        let rows = stmt
            .query_map([category.as_str()], ItemRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter().map(ItemRow::decode).collect()
    }

    /// Delete an item. Returns false if no such item existed.
    pub fn remove(&self, id: &str) -> DbResult<bool> {
        let conn = self.db.lock();
        let removed = conn.execute("DELETE FROM clothes WHERE id = ?1", params![id])?;
        Ok(removed > 0)
    }

    pub fn count(&self) -> DbResult<usize> {
        let conn = self.db.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM clothes", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

// ==================== OUTFIT QUERIES ====================

struct OutfitRow {
    id: String,
    name: String,
    items: String,
    created_date: String,
    image_preview: Option<String>,
}

impl OutfitRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(OutfitRow {
            id: row.get(0)?,
            name: row.get(1)?,
            items: row.get(2)?,
            created_date: row.get(3)?,
            image_preview: row.get(4)?,
        })
    }

    fn decode(self) -> DbResult<Outfit> {
        let invalid = |reason: String| DbError::InvalidRecord {
            table: "outfits",
            reason,
        };

        let created_date = parse_timestamp(&self.created_date)
            .map_err(|e| invalid(format!("outfit {}: bad createdDate: {}", self.id, e)))?;
        let items = serde_json::from_str::<Vec<OutfitItemSnapshot>>(&self.items)
            .map_err(|e| invalid(format!("outfit {}: bad items: {}", self.id, e)))?;

        Ok(Outfit {
            items,
            id: self.id,
            name: self.name,
            created_date,
            // Older rows stored '' for "no preview"
            image_preview: self.image_preview.filter(|p| !p.is_empty()),
        })
    }
}

/// Outfits stored in the `outfits` table, each carrying its own item snapshots
#[derive(Clone)]
pub struct OutfitRepository {
    db: DbConnection,
}

impl OutfitRepository {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }

    /// Insert a new outfit. Rejects outfits with no name or no items.
    pub fn add(&self, outfit: &Outfit) -> DbResult<()> {
        require_name("Outfit", &outfit.name)?;
        if outfit.items.is_empty() {
            return Err(DbError::Validation(
                "Outfit must contain at least one item".to_string(),
            ));
        }
        let items = serde_json::to_string(&outfit.items)?;

        let conn = self.db.lock();
        conn.execute(
            "INSERT INTO outfits (id, name, items, createdDate, imagePreview)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                outfit.id,
                outfit.name,
                items,
                format_timestamp(&outfit.created_date),
                outfit.image_preview,
            ],
        )
        .map_err(|e| insert_error("outfits", &outfit.id, e))?;

        log::debug!("Added outfit {} with {} items", outfit.id, outfit.items.len());
        Ok(())
    }

    /// Get an outfit by ID
    pub fn get(&self, id: &str) -> DbResult<Option<Outfit>> {
        let conn = self.db.lock();
        let row = conn
            .query_row(
                &format!("SELECT {} FROM outfits WHERE id = ?1", OUTFIT_COLUMNS),
                [id],
                OutfitRow::from_row,
            )
            .optional()?;

        row.map(OutfitRow::decode).transpose()
    }

    /// All outfits, newest first
    pub fn list(&self) -> DbResult<Vec<Outfit>> {
        let conn = self.db.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM outfits ORDER BY createdDate DESC, rowid DESC",
            OUTFIT_COLUMNS
        ))?;

        let rows = stmt
            .query_map([], OutfitRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter().map(OutfitRow::decode).collect()
    }

    /// Delete an outfit. Returns false if no such outfit existed.
    pub fn remove(&self, id: &str) -> DbResult<bool> {
        let conn = self.db.lock();
        let removed = conn.execute("DELETE FROM outfits WHERE id = ?1", params![id])?;
        Ok(removed > 0)
    }
}

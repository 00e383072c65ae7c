use crate::domain::{GridData, GridDimensions, PersistenceError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

pub const DEFAULT_GRID_KIND: &str = "spreadsheet";

/// Whole-grid document handed to and returned from a gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridSnapshot {
    #[serde(rename = "gridData", default)]
    pub grid_data: GridData,
    pub rows: usize,
    pub cols: usize,
    #[serde(default = "default_kind")]
    pub kind: String,
}

fn default_kind() -> String {
    DEFAULT_GRID_KIND.to_string()
}

impl GridSnapshot {
    pub fn new(grid_data: GridData, dims: GridDimensions) -> Self {
        Self {
            grid_data,
            rows: dims.rows,
            cols: dims.cols,
            kind: default_kind(),
        }
    }

    /// Stored dimensions, grown if needed so every stored cell is addressable.
    pub fn dimensions(&self) -> GridDimensions {
        let mut dims = GridDimensions::new(self.rows, self.cols);
        if let Some(extent) = self.grid_data.extent() {
            dims.grow_to_fit(extent);
        }
        dims
    }
}

/// Remote (or local) store for whole grids. Saves always carry the complete
/// grid, so concurrent writers resolve as last-writer-wins.
pub trait PersistenceGateway {
    fn save(&mut self, grid_id: &str, snapshot: &GridSnapshot) -> Result<(), PersistenceError>;

    /// `Ok(None)` when no grid with this id has been saved yet.
    fn load(&self, grid_id: &str) -> Result<Option<GridSnapshot>, PersistenceError>;
}

/// One pretty-printed JSON document per grid under a data directory.
pub struct FileRepository {
    root: PathBuf,
}

impl FileRepository {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_for(&self, grid_id: &str) -> PathBuf {
        self.root.join(format!("{}.json", sanitize_grid_id(grid_id)))
    }
}

impl PersistenceGateway for FileRepository {
    fn save(&mut self, grid_id: &str, snapshot: &GridSnapshot) -> Result<(), PersistenceError> {
        fs::create_dir_all(&self.root)?;
        let json = serde_json::to_string_pretty(snapshot)?;

        // Write then rename so a crash mid-write never leaves a torn document.
        let path = self.path_for(grid_id);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn load(&self, grid_id: &str) -> Result<Option<GridSnapshot>, PersistenceError> {
        let path = self.path_for(grid_id);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)?;
        let snapshot = serde_json::from_str::<GridSnapshot>(&content)?;
        Ok(Some(snapshot))
    }
}

/// Maps a grid id onto a safe file stem.
pub fn sanitize_grid_id(grid_id: &str) -> String {
    let stem: String = grid_id
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if stem.is_empty() { "default".to_string() } else { stem }
}

/// In-process gateway.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    grids: HashMap<String, GridSnapshot>,
    pub save_count: usize,
    pub fail_saves: bool,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, grid_id: &str) -> Option<&GridSnapshot> {
        self.grids.get(grid_id)
    }
}

impl PersistenceGateway for MemoryRepository {
    fn save(&mut self, grid_id: &str, snapshot: &GridSnapshot) -> Result<(), PersistenceError> {
        if self.fail_saves {
            return Err(PersistenceError::Rejected("save rejected".to_string()));
        }
        self.save_count += 1;
        self.grids.insert(grid_id.to_string(), snapshot.clone());
        Ok(())
    }

    fn load(&self, grid_id: &str) -> Result<Option<GridSnapshot>, PersistenceError> {
        Ok(self.grids.get(grid_id).cloned())
    }
}

//! Column registry: a fixed set of built-in columns plus runtime-registered
//! extension columns, addressed through one combined index space.

/// Built-in column indices.
pub const ENTRY_COLUMN: usize = 0;
pub const SUBDIRECTORY_COLUMN: usize = 1;
pub const NAME_IS_EDITABLE_COLUMN: usize = 9;

/// Number of built-in columns: entry, subdirectory, seven icon sizes, and
/// the name-is-editable flag. Extension columns start at this index.
pub const NUM_BUILTIN_COLUMNS: usize = 10;

/// Zoom levels for the icon columns, smallest to largest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ZoomLevel {
    Smallest,
    Smaller,
    Small,
    Standard,
    Large,
    Larger,
    Largest,
}

impl ZoomLevel {
    pub const ALL: [ZoomLevel; 7] = [
        ZoomLevel::Smallest,
        ZoomLevel::Smaller,
        ZoomLevel::Small,
        ZoomLevel::Standard,
        ZoomLevel::Large,
        ZoomLevel::Larger,
        ZoomLevel::Largest,
    ];

    /// Nominal icon size in pixels for this zoom level.
    pub fn icon_size(self) -> u16 {
        match self {
            ZoomLevel::Smallest => 16,
            ZoomLevel::Smaller => 24,
            ZoomLevel::Small => 32,
            ZoomLevel::Standard => 48,
            ZoomLevel::Large => 64,
            ZoomLevel::Larger => 96,
            ZoomLevel::Largest => 128,
        }
    }
}

/// Column index of the icon column for a zoom level.
pub fn icon_column_for_zoom(zoom: ZoomLevel) -> usize {
    2 + zoom as usize
}

/// Zoom level for an icon column index, `None` for non-icon columns.
pub fn zoom_for_icon_column(column: usize) -> Option<ZoomLevel> {
    column
        .checked_sub(2)
        .and_then(|i| ZoomLevel::ALL.get(i).copied())
}

/// Kind of value a column produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// The shared file entry object.
    Entry,
    /// The bound subdirectory scope, if the row is expanded.
    Subdirectory,
    /// Icon glyph at one of the zoom levels.
    Icon,
    /// Boolean flag (name-is-editable).
    Bool,
    /// Stringly-typed extension column value.
    Text,
    /// Sentinel for out-of-range column indices.
    Invalid,
}

/// A runtime-registered extension column backed by a string attribute.
#[derive(Debug, Clone)]
pub struct ColumnDescriptor {
    pub name: String,
    pub attribute: String,
}

/// Registry of built-in and extension columns.
#[derive(Debug, Default)]
pub struct ColumnRegistry {
    extensions: Vec<ColumnDescriptor>,
}

impl ColumnRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of addressable columns.
    pub fn column_count(&self) -> usize {
        NUM_BUILTIN_COLUMNS + self.extensions.len()
    }

    /// Kind of the column at `index`; `Invalid` when out of range.
    pub fn column_kind(&self, index: usize) -> ColumnKind {
        match index {
            ENTRY_COLUMN => ColumnKind::Entry,
            SUBDIRECTORY_COLUMN => ColumnKind::Subdirectory,
            i if zoom_for_icon_column(i).is_some() => ColumnKind::Icon,
            NAME_IS_EDITABLE_COLUMN => ColumnKind::Bool,
            i if i < self.column_count() => ColumnKind::Text,
            _ => ColumnKind::Invalid,
        }
    }

    /// Register an extension column; returns its combined column index.
    /// Existing rows report an empty value for it until populated.
    pub fn add_column(&mut self, name: &str, attribute: &str) -> usize {
        self.extensions.push(ColumnDescriptor {
            name: name.to_string(),
            attribute: attribute.to_string(),
        });
        NUM_BUILTIN_COLUMNS + self.extensions.len() - 1
    }

    /// Look up an extension column index by its registered name.
    pub fn column_number(&self, name: &str) -> Option<usize> {
        self.extensions
            .iter()
            .position(|c| c.name == name)
            .map(|i| NUM_BUILTIN_COLUMNS + i)
    }

    /// The backing attribute of an extension column, `None` for built-ins
    /// and out-of-range indices.
    pub fn attribute_for_column(&self, index: usize) -> Option<&str> {
        index
            .checked_sub(NUM_BUILTIN_COLUMNS)
            .and_then(|i| self.extensions.get(i))
            .map(|c| c.attribute.as_str())
    }

    /// The sortable column index whose backing attribute matches.
    ///
    /// The preferences layer historically says `modification_date` where the
    /// column is registered as `date_modified`; accept both.
    pub fn sort_column_for_attribute(&self, attribute: &str) -> Option<usize> {
        let attribute = if attribute == "modification_date" {
            "date_modified"
        } else {
            attribute
        };
        self.extensions
            .iter()
            .position(|c| c.attribute == attribute)
            .map(|i| NUM_BUILTIN_COLUMNS + i)
    }
}

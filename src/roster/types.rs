/// One student in the roster sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterEntry {
    /// Platform username (e.g., GitHub login); unique across the roster
    pub external_identity: String,
    /// Full name as typed into the sheet, possibly with irregular spacing
    pub display_name: String,
}

/// One row of the variants sheet, keyed by display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantAssignment {
    pub display_name: String,
    /// None when the stored cell is not an integer
    pub variant_number: Option<u32>,
}

/// Collapse whitespace runs to single spaces and trim the ends.
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join(" ")
}

//! Organization structure features

use super::{flag, map_rows, presence};
use crate::logic::dataset::{DatasetError, Table};

pub const SUBPART: &str = "Is Organization Subpart";
pub const PARENT_ORG: &str = "Parent Organization LBN";

pub fn add_organization_features(table: &mut Table) -> Result<(), DatasetError> {
    if table.has_column(SUBPART) {
        let subpart = map_rows(table, |row| flag(row.get(SUBPART) == Some("Y")));
        table.add_numeric_column("is_subpart", subpart)?;
    }

    if table.has_column(PARENT_ORG) {
        let parent = presence(table, PARENT_ORG);
        table.add_numeric_column("has_parent_org", parent)?;
    }
    Ok(())
}

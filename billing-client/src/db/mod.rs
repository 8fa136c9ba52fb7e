pub mod consumption_queries;
pub mod reference_queries;
pub mod snapshot_queries;

/// One page of an ordered time-series read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub offset: i64,
    pub limit: i64,
}

#[cfg(test)]
mod tests {
    const REFERENCE_SCHEMA: &str = include_str!("../../sql/schema/01_reference_tables.sql");

    #[test]
    fn facility_ids_are_unique_across_accounts() {
        let settings = REFERENCE_SCHEMA
            .split("CREATE TABLE")
            .find(|t| t.contains("facility_settings ("))
            .unwrap();
        assert!(settings.contains("UNIQUE (facility_id)"));
    }
}

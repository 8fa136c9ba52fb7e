use serde::{Deserialize, Serialize};

text_enum! {
    /// Time-of-use tier of a supply contract.
    pub enum TimeOfUseTier ("time-of-use tier") {
        Single => "single",
        Double => "double",
        Triple => "triple",
    }
}

text_enum! {
    pub enum VoltageLevel ("voltage level") {
        Low => "low",
        Medium => "medium",
        High => "high",
    }
}

text_enum! {
    pub enum Sector ("sector") {
        Residential => "residential",
        Commercial => "commercial",
        Industrial => "industrial",
        Agricultural => "agricultural",
        Lighting => "lighting",
    }
}

/// The attributes a tariff row and a facility must agree on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::FromRow, Serialize, Deserialize)]
pub struct ContractClass {
    #[sqlx(try_from = "String")]
    pub tier: TimeOfUseTier,
    #[sqlx(try_from = "String")]
    pub voltage: VoltageLevel,
    #[sqlx(try_from = "String")]
    pub sector: Sector,
}

impl std::fmt::Display for ContractClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.tier, self.voltage, self.sector)
    }
}

pub const SPBV01: &str = "spBv1.0";

pub const NBIRTH: &str = "NBIRTH";
pub const NDEATH: &str = "NDEATH";
pub const NDATA: &str = "NDATA";

pub const DBIRTH: &str = "DBIRTH";
pub const DDEATH: &str = "DDEATH";
pub const DDATA: &str = "DDATA";

pub const STATE: &str = "STATE";

/// Single level topic filter wildcard
pub const SINGLE_LEVEL_WILDCARD: &str = "+";
/// Multi level topic filter wildcard
pub const MULTI_LEVEL_WILDCARD: &str = "#";

// Error codes implementation
// Stable codes surfaced by the CLI and in structured logs

pub mod validation {
    pub const INVALID_INPUT: &str = "VALIDATION_1001";
}

pub mod backend {
    pub const REQUEST_FAILED: &str = "BACKEND_2001";
    pub const NOT_FOUND: &str = "BACKEND_2002";
    pub const DECODE_FAILED: &str = "BACKEND_2003";
}

pub mod business {
    pub const RULE_VIOLATION: &str = "BUSINESS_3001";
}

pub mod config {
    pub const LOAD_FAILED: &str = "CONFIG_4001";
}

pub mod system {
    pub const IO_FAILED: &str = "SYSTEM_5001";
    pub const INTERNAL: &str = "SYSTEM_5999";
}

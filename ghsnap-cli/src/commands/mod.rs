pub mod list;
pub mod setup;
pub mod user;

use std::str::FromStr;

use ghsnap_core::types::parse_field_list;

/// Thin wrapper so clap can parse `--json a,b,c` into one field list.
#[derive(Debug, Clone)]
pub struct FieldListArg(pub Vec<String>);

impl FromStr for FieldListArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields = parse_field_list(s);
        if fields.is_empty() {
            return Err("expected at least one field name".to_string());
        }
        Ok(Self(fields))
    }
}

impl From<FieldListArg> for Vec<String> {
    fn from(f: FieldListArg) -> Self {
        f.0
    }
}

//! Case conversion for catalog fields: field names are camelCase, column names default to snake_case.

/// Convert a single identifier from camelCase to snake_case.
/// Acronym runs stay together: "resourceID" -> "resource_id", "hostIPAddress" -> "host_ip_address".
pub fn to_snake_case(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                let prev = chars[i - 1];
                let next_is_lower = chars.get(i + 1).map(|n| n.is_lowercase()).unwrap_or(false);
                let boundary = prev.is_lowercase()
                    || prev.is_ascii_digit()
                    || (prev.is_uppercase() && next_is_lower);
                if boundary {
                    out.push('_');
                }
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_camel_case() {
        assert_eq!(to_snake_case("hostName"), "host_name");
        assert_eq!(to_snake_case("maxMemoryPerNode"), "max_memory_per_node");
    }

    #[test]
    fn acronyms() {
        assert_eq!(to_snake_case("resourceID"), "resource_id");
        assert_eq!(to_snake_case("hostIPAddress"), "host_ip_address");
        assert_eq!(to_snake_case("gatewayID"), "gateway_id");
    }

    #[test]
    fn already_snake() {
        assert_eq!(to_snake_case("command"), "command");
        assert_eq!(to_snake_case("created_at"), "created_at");
    }
}

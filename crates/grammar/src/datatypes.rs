//! Built-in data-type validators.
//!
//! Each validator is a bytewise recognizer over ASCII. They are registered
//! as validator words at context construction, exposed to the grammar DSL
//! by their upper-case names.

use common::quoted_len;

use crate::grammar::Grammar;
use crate::node::Validator;

fn parse_boolean(s: &str) -> bool {
    matches!(s, "on" | "off" | "0" | "1")
}

// Optional sign, decimal digits, no trailing junk, within i64 range.
fn parse_integer(s: &str) -> bool {
    s.parse::<i64>().is_ok()
}

fn parse_ipv4addr(s: &str) -> bool {
    let mut octets = 0;
    for part in s.split('.') {
        if part.is_empty() || part.len() > 3 || !part.bytes().all(|b| b.is_ascii_digit()) {
            return false;
        }
        match part.parse::<u16>() {
            Ok(v) if v <= 255 => octets += 1,
            _ => return false,
        }
    }
    octets == 4
}

// Deliberately loose: hex digits and colons, no structural check.
fn parse_ipv6addr(s: &str) -> bool {
    !s.is_empty()
        && s.contains(':')
        && s.bytes().all(|b| b.is_ascii_hexdigit() || b == b':')
}

fn parse_ipaddr(s: &str) -> bool {
    parse_ipv4addr(s) || parse_ipv6addr(s)
}

fn parse_ipprefix(s: &str) -> bool {
    match s.split_once('/') {
        Some((addr, len)) => {
            parse_ipv4addr(addr)
                && !len.is_empty()
                && len.bytes().all(|b| b.is_ascii_digit())
                && matches!(len.parse::<u8>(), Ok(v) if v <= 32)
        }
        None => false,
    }
}

fn parse_macaddr(s: &str) -> bool {
    let mut bytes = 0;
    for part in s.split(':') {
        if part.is_empty() || part.len() > 2 || !part.bytes().all(|b| b.is_ascii_hexdigit()) {
            return false;
        }
        bytes += 1;
    }
    bytes == 6
}

fn parse_hostname(s: &str) -> bool {
    if s == "." {
        return true;
    }
    if s.is_empty() || s.len() > 253 {
        return false;
    }
    // One trailing dot marks a fully qualified name.
    let name = s.strip_suffix('.').unwrap_or(s);
    if name.is_empty() {
        return false;
    }
    name.split('.').all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && label.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-')
    })
}

fn parse_string(s: &str) -> bool {
    match s.as_bytes().first() {
        Some(b'"') | Some(b'\'') | Some(b'`') => quoted_len(s) == Some(s.len()),
        _ => !s.is_empty(),
    }
}

fn parse_dqstring(s: &str) -> bool {
    s.starts_with('"') && parse_string(s)
}

fn parse_sqstring(s: &str) -> bool {
    s.starts_with('\'') && parse_string(s)
}

fn parse_bqstring(s: &str) -> bool {
    s.starts_with('`') && parse_string(s)
}

/// The built-in data types, in registration order.
pub const BUILTINS: &[(&str, Validator)] = &[
    (
        "BOOLEAN",
        Validator {
            parse: parse_boolean,
            error: "Invalid boolean value",
        },
    ),
    (
        "HOSTNAME",
        Validator {
            parse: parse_hostname,
            error: "Invalid hostname",
        },
    ),
    (
        "INTEGER",
        Validator {
            parse: parse_integer,
            error: "Invalid integer",
        },
    ),
    (
        "IPADDR",
        Validator {
            parse: parse_ipaddr,
            error: "Invalid syntax for IP address",
        },
    ),
    (
        "IPV4ADDR",
        Validator {
            parse: parse_ipv4addr,
            error: "Invalid syntax for IP address",
        },
    ),
    (
        "IPV6ADDR",
        Validator {
            parse: parse_ipv6addr,
            error: "Invalid syntax for IPv6 address",
        },
    ),
    (
        "IPPREFIX",
        Validator {
            parse: parse_ipprefix,
            error: "Invalid syntax for IP prefix",
        },
    ),
    (
        "MACADDR",
        Validator {
            parse: parse_macaddr,
            error: "Invalid syntax for MAC address",
        },
    ),
    (
        "STRING",
        Validator {
            parse: parse_string,
            error: "Invalid string",
        },
    ),
    (
        "DQSTRING",
        Validator {
            parse: parse_dqstring,
            error: "Expected a double-quoted string",
        },
    ),
    (
        "SQSTRING",
        Validator {
            parse: parse_sqstring,
            error: "Expected a single-quoted string",
        },
    ),
    (
        "BQSTRING",
        Validator {
            parse: parse_bqstring,
            error: "Expected a back-quoted string",
        },
    ),
];

/// Register every built-in data type into a fresh context.
pub(crate) fn register_builtins(g: &mut Grammar<'_>) {
    for (name, validator) in BUILTINS {
        g.register_datatype(name, *validator)
            .expect("built-in data types register cleanly");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boolean() {
        for ok in ["on", "off", "0", "1"] {
            assert!(parse_boolean(ok), "{}", ok);
        }
        for bad in ["yes", "ON", "2", ""] {
            assert!(!parse_boolean(bad), "{}", bad);
        }
    }

    #[test]
    fn test_integer() {
        for ok in ["0", "42", "-7", "+9", "9223372036854775807"] {
            assert!(parse_integer(ok), "{}", ok);
        }
        for bad in ["", "1x", "0x10", "9223372036854775808", "--1", "1.5"] {
            assert!(!parse_integer(bad), "{}", bad);
        }
    }

    #[test]
    fn test_ipv4addr() {
        for ok in ["0.0.0.0", "10.0.0.1", "255.255.255.255"] {
            assert!(parse_ipv4addr(ok), "{}", ok);
        }
        for bad in ["10.0.0.300", "1.2.3", "1.2.3.4.5", "a.b.c.d", "1..2.3", "-1.0.0.0"] {
            assert!(!parse_ipv4addr(bad), "{}", bad);
        }
    }

    #[test]
    fn test_ipv6addr_is_loose() {
        assert!(parse_ipv6addr("::1"));
        assert!(parse_ipv6addr("fe80::dead:beef"));
        // The check is only hex-and-colons.
        assert!(parse_ipv6addr("::::"));
        assert!(!parse_ipv6addr("10.0.0.1"));
        assert!(!parse_ipv6addr("fe80::g"));
    }

    #[test]
    fn test_ipprefix() {
        assert!(parse_ipprefix("10.0.0.0/8"));
        assert!(parse_ipprefix("192.168.0.0/32"));
        assert!(!parse_ipprefix("10.0.0.0/33"));
        assert!(!parse_ipprefix("10.0.0.0"));
        assert!(!parse_ipprefix("10.0.0.0/"));
        assert!(!parse_ipprefix("::1/8"));
    }

    #[test]
    fn test_macaddr() {
        assert!(parse_macaddr("00:11:22:aa:bb:cc"));
        assert!(parse_macaddr("0:1:2:3:4:5"));
        assert!(!parse_macaddr("00:11:22:aa:bb"));
        assert!(!parse_macaddr("00:11:22:aa:bb:cc:dd"));
        assert!(!parse_macaddr("00:11:22:aa:bb:zz"));
        assert!(!parse_macaddr("001:11:22:aa:bb:cc"));
    }

    #[test]
    fn test_hostname() {
        for ok in [".", "localhost", "example.com", "a-1.b-2.c", "example.com."] {
            assert!(parse_hostname(ok), "{}", ok);
        }
        let long_label = "a".repeat(64);
        for bad in ["", "-bad.com", "a..b", long_label.as_str(), "under_score"] {
            assert!(!parse_hostname(bad), "{}", bad);
        }
        let too_long = format!("{}.{}", "a".repeat(63), "b".repeat(200));
        assert!(!parse_hostname(&too_long));
    }

    #[test]
    fn test_strings() {
        assert!(parse_string("word"));
        assert!(parse_string("\"quoted text\""));
        assert!(parse_string("'a \\' b'"));
        assert!(!parse_string("\"unterminated"));
        assert!(!parse_string("\"trailing\"x"));

        assert!(parse_dqstring("\"x\""));
        assert!(!parse_dqstring("'x'"));
        assert!(parse_sqstring("'x'"));
        assert!(!parse_sqstring("\"x\""));
        assert!(parse_bqstring("`x`"));
        assert!(!parse_bqstring("x"));
    }
}

//! The status operation language.
//!
//! Each spec line has the shape `field = op[:arg1[:arg2...]]`. Arguments are
//! raw colon-separated strings after the operation name; ops that take a
//! JSON literal or a trailing text re-join the remaining pieces so literals
//! may themselves contain colons. Parsing resolves every line into a tagged
//! [`Op`] variant, so unknown operations, malformed literals and references
//! to not-yet-declared fields all fail at load time.

use serde_json::Value;

/// One named operation from a status spec.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    pub field: String,
    pub op: Op,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    Const(Value),
    ConstStr(String),
    FileJson { rel_path: String, default: Value },
    FileExists { rel_path: String },
    ProcessRunning { name: String },
    PortListening { host: String, port: i64, timeout_ms: i64 },
    Derive(DeriveOp),
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeriveOp {
    Copy { src: String },
    BoolFromObj { src: String, key: String, default: bool },
    IntFromObj { src: String, key: String },
    StrFromObj { src: String, key: String, default: String },
    JsonFromObj { src: String, key: String, default: Value },
    RunningDisplay { running: String, pid: String },
    StrIfBool { src: String, true_text: String, false_text: String },
    PickInt { primary: String, fallback: String },
    OrBool { left: String, right: String },
}

impl Op {
    /// Fields this operation reads from the evaluation table. Used by the
    /// spec loader to enforce declaration order.
    pub fn referenced_fields(&self) -> Vec<&str> {
        match self {
            Op::Derive(derive) => match derive {
                DeriveOp::Copy { src } => vec![src],
                DeriveOp::BoolFromObj { src, .. } => vec![src],
                DeriveOp::IntFromObj { src, .. } => vec![src],
                DeriveOp::StrFromObj { src, .. } => vec![src],
                DeriveOp::JsonFromObj { src, .. } => vec![src],
                DeriveOp::RunningDisplay { running, pid } => vec![running, pid],
                DeriveOp::StrIfBool { src, .. } => vec![src],
                DeriveOp::PickInt { primary, fallback } => vec![primary, fallback],
                DeriveOp::OrBool { left, right } => vec![left, right],
            },
            _ => Vec::new(),
        }
    }
}

pub(crate) fn parse_bool_text(text: &str, default: bool) -> bool {
    match text.trim() {
        "true" | "TRUE" | "1" => true,
        "false" | "FALSE" | "0" => false,
        _ => default,
    }
}

fn parse_int_text(text: &str) -> Option<i64> {
    text.trim().parse::<i64>().ok()
}

fn parse_json_literal(text: &str) -> Option<Value> {
    serde_json::from_str(text).ok()
}

fn require_arg<'a>(args: &'a [&str], index: usize, message: &str) -> Result<&'a str, String> {
    args.get(index).copied().ok_or_else(|| message.to_string())
}

fn parse_derive(args: &[&str]) -> Result<DeriveOp, String> {
    let sub = require_arg(args, 0, "derive requires sub-operation")?.trim();

    match sub {
        "copy" => Ok(DeriveOp::Copy {
            src: require_arg(args, 1, "derive copy requires source field")?
                .trim()
                .to_string(),
        }),
        "bool_from_obj" => {
            if args.len() < 3 {
                return Err("derive bool_from_obj requires source and key".to_string());
            }
            Ok(DeriveOp::BoolFromObj {
                src: args[1].trim().to_string(),
                key: args[2].trim().to_string(),
                default: args.get(3).map_or(false, |text| parse_bool_text(text, false)),
            })
        }
        "int_from_obj" => {
            if args.len() < 3 {
                return Err("derive int_from_obj requires source and key".to_string());
            }
            Ok(DeriveOp::IntFromObj {
                src: args[1].trim().to_string(),
                key: args[2].trim().to_string(),
            })
        }
        "str_from_obj" => {
            if args.len() < 3 {
                return Err("derive str_from_obj requires source and key".to_string());
            }
            Ok(DeriveOp::StrFromObj {
                src: args[1].trim().to_string(),
                key: args[2].trim().to_string(),
                default: args.get(3).map_or_else(String::new, |text| text.to_string()),
            })
        }
        "json_from_obj" => {
            if args.len() < 3 {
                return Err("derive json_from_obj requires source and key".to_string());
            }
            Ok(DeriveOp::JsonFromObj {
                src: args[1].trim().to_string(),
                key: args[2].trim().to_string(),
                default: args
                    .get(3)
                    .and_then(|text| parse_json_literal(text.trim()))
                    .unwrap_or(Value::Null),
            })
        }
        "running_display" => {
            if args.len() < 3 {
                return Err("derive running_display requires running and pid fields".to_string());
            }
            Ok(DeriveOp::RunningDisplay {
                running: args[1].trim().to_string(),
                pid: args[2].trim().to_string(),
            })
        }
        "str_if_bool" => {
            if args.len() < 4 {
                return Err("derive str_if_bool requires bool field and true/false text".to_string());
            }
            Ok(DeriveOp::StrIfBool {
                src: args[1].trim().to_string(),
                true_text: args[2].to_string(),
                false_text: args[3].to_string(),
            })
        }
        "pick_int" => {
            if args.len() < 3 {
                return Err("derive pick_int requires primary and fallback fields".to_string());
            }
            Ok(DeriveOp::PickInt {
                primary: args[1].trim().to_string(),
                fallback: args[2].trim().to_string(),
            })
        }
        "or_bool" => {
            if args.len() < 3 {
                return Err("derive or_bool requires two bool fields".to_string());
            }
            Ok(DeriveOp::OrBool {
                left: args[1].trim().to_string(),
                right: args[2].trim().to_string(),
            })
        }
        other => Err(format!("unsupported derive operation: {other}")),
    }
}

/// Parses one `field = op[:arg...]` line.
pub fn parse_operation_line(line: &str) -> Result<Operation, String> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Err("operation line is empty".to_string());
    }

    let Some(equal_index) = trimmed.find('=') else {
        return Err(format!("invalid operation line: {trimmed}"));
    };

    let field = trimmed[..equal_index].trim().to_string();
    if field.is_empty() {
        return Err("operation field is empty".to_string());
    }

    let expression = trimmed[equal_index + 1..].trim();
    if expression.is_empty() {
        return Err(format!("invalid operation line: {trimmed}"));
    }

    let parts: Vec<&str> = expression.split(':').collect();
    let op_name = parts[0].trim();
    if op_name.is_empty() {
        return Err("operation name is empty".to_string());
    }
    let args = &parts[1..];

    let op = match op_name {
        "const" => {
            let literal = args.join(":");
            let literal = literal.trim();
            match parse_json_literal(literal) {
                Some(value) => Op::Const(value),
                None => return Err("const op requires JSON literal".to_string()),
            }
        }
        "const_str" => Op::ConstStr(args.join(":")),
        "file_json" => {
            let rel_path = require_arg(args, 0, "file_json requires path argument")?
                .trim()
                .to_string();
            let default = if args.len() > 1 {
                let raw = args[1..].join(":");
                let raw = raw.trim();
                if raw.is_empty() {
                    Value::Object(Default::default())
                } else {
                    parse_json_literal(raw).unwrap_or_else(|| Value::Object(Default::default()))
                }
            } else {
                Value::Object(Default::default())
            };
            Op::FileJson { rel_path, default }
        }
        "file_exists" => Op::FileExists {
            rel_path: require_arg(args, 0, "file_exists requires path argument")?
                .trim()
                .to_string(),
        },
        "process_running" => Op::ProcessRunning {
            name: require_arg(args, 0, "process_running requires process name")?
                .trim()
                .to_string(),
        },
        "port_listening" => {
            if args.len() < 2 {
                return Err("port_listening requires host and port".to_string());
            }
            let port =
                parse_int_text(args[1]).ok_or_else(|| "port_listening invalid port".to_string())?;
            let timeout_ms = args.get(2).and_then(|text| parse_int_text(text)).unwrap_or(250);
            Op::PortListening {
                host: args[0].trim().to_string(),
                port,
                timeout_ms,
            }
        }
        "derive" => Op::Derive(parse_derive(args)?),
        other => return Err(format!("unsupported operation: {other}")),
    };

    Ok(Operation { field, op })
}

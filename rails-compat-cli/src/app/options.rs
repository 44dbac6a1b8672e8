use std::{
    fmt::{Display, Formatter},
    path::PathBuf,
};

use base64::{prelude::BASE64_STANDARD, Engine};
use clap::{
    crate_description, crate_name, crate_version, value_parser, Arg, ArgAction, ArgMatches,
    Command,
};

use rails_compat::util::marshal::parser::DEFAULT_MAX_DEPTH;

use crate::app::error::RuntimeError;

/// Option constants
pub const OPTION_MARSHAL: &str = "marshal";
pub const OPTION_INPUT: &str = "input";
pub const OPTION_BASE64: &str = "base64";
pub const OPTION_COOKIE: &str = "cookie";
pub const OPTION_SECRET_KEY_BASE: &str = "secret-key-base";
pub const OPTION_VERIFY: &str = "verify";
pub const OPTION_SIGN: &str = "sign";
pub const OPTION_SECRET: &str = "secret";
pub const OPTION_PURPOSE: &str = "purpose";
pub const OPTION_FORMAT: &str = "format";
pub const OPTION_MAX_DEPTH: &str = "max-depth";
pub const OPTION_EXPORT_PATH: &str = "export-path";

/// Input modes, exactly one of which must be used
const SOURCE_OPTIONS: [&str; 5] = [
    OPTION_MARSHAL,
    OPTION_INPUT,
    OPTION_COOKIE,
    OPTION_VERIFY,
    OPTION_SIGN,
];

/// Deepest nesting a user may allow
pub const MAX_DEPTH_LIMIT: usize = 1000;

// Other CLI Text
pub const SUPPORTED_FORMATS: &str = "txt, json";

/// Where the data to decode comes from
#[derive(Debug, PartialEq, Eq)]
pub enum Source {
    /// Base64 encoded `Marshal` data passed on the command line
    Marshal(String),
    /// A file of `Marshal` data, base64 encoded if the flag is set
    File(PathBuf, bool),
    /// An encrypted session cookie and the application's `secret_key_base`
    Cookie { value: String, secret_key_base: String },
    /// A signed message to check
    Verify {
        signed: String,
        secret: Vec<u8>,
        purpose: String,
    },
    /// A value to sign
    Sign {
        value: String,
        secret: Vec<u8>,
        purpose: String,
    },
}

/// The output formats the app can render decoded data in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportType {
    /// Indented plain text
    Txt,
    /// A single JSON document
    Json,
}

impl ExportType {
    /// Given user's input, return a variant if the input matches one
    pub fn from_cli(format: &str) -> Option<Self> {
        match format.to_lowercase().as_str() {
            "txt" => Some(Self::Txt),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

impl Display for ExportType {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportType::Txt => write!(fmt, "txt"),
            ExportType::Json => write!(fmt, "json"),
        }
    }
}

#[derive(Debug)]
pub struct Options {
    /// The data to decode
    pub source: Source,
    /// The format to render the result in
    pub export_type: ExportType,
    /// How deeply `Marshal` values may nest
    pub max_depth: usize,
    /// Where to write the result; stdout when empty
    pub export_path: Option<PathBuf>,
}

impl Options {
    pub fn from_args(args: &ArgMatches) -> Result<Self, RuntimeError> {
        let marshal = args.get_one::<String>(OPTION_MARSHAL);
        let input = args.get_one::<String>(OPTION_INPUT);
        let base64 = args.get_flag(OPTION_BASE64);
        let cookie = args.get_one::<String>(OPTION_COOKIE);
        let secret_key_base = args.get_one::<String>(OPTION_SECRET_KEY_BASE);
        let verify = args.get_one::<String>(OPTION_VERIFY);
        let sign = args.get_one::<String>(OPTION_SIGN);
        let secret = args.get_one::<String>(OPTION_SECRET);
        let purpose = args.get_one::<String>(OPTION_PURPOSE);
        let format = args.get_one::<String>(OPTION_FORMAT);
        let max_depth = args.get_one::<usize>(OPTION_MAX_DEPTH);
        let export_path = args.get_one::<String>(OPTION_EXPORT_PATH);

        // Ensure exactly one input mode is used
        let sources: Vec<&str> = SOURCE_OPTIONS
            .into_iter()
            .filter(|option| args.contains_id(option))
            .collect();
        if sources.len() != 1 {
            return Err(RuntimeError::InvalidOptions(format!(
                "Exactly one of {} must be provided, got {}!",
                list_options(&SOURCE_OPTIONS),
                if sources.is_empty() {
                    "none".to_string()
                } else {
                    list_options(&sources)
                }
            )));
        }

        // Ensure modifiers are only used with the mode they modify
        if base64 && input.is_none() {
            return Err(RuntimeError::InvalidOptions(format!(
                "Option --{OPTION_BASE64} is enabled, which requires --{OPTION_INPUT}"
            )));
        }
        if secret_key_base.is_some() && cookie.is_none() {
            return Err(RuntimeError::InvalidOptions(format!(
                "Option --{OPTION_SECRET_KEY_BASE} is enabled, which requires --{OPTION_COOKIE}"
            )));
        }
        if (secret.is_some() || purpose.is_some()) && verify.is_none() && sign.is_none() {
            return Err(RuntimeError::InvalidOptions(format!(
                "Options --{OPTION_SECRET} and --{OPTION_PURPOSE} require --{OPTION_VERIFY} or --{OPTION_SIGN}"
            )));
        }
        if max_depth.is_some() && marshal.is_none() && input.is_none() {
            return Err(RuntimeError::InvalidOptions(format!(
                "Option --{OPTION_MAX_DEPTH} is enabled, which requires --{OPTION_MARSHAL} or --{OPTION_INPUT}"
            )));
        }

        let source = if let Some(data) = marshal {
            Source::Marshal(data.to_string())
        } else if let Some(path) = input {
            Source::File(PathBuf::from(path), base64)
        } else if let Some(value) = cookie {
            let Some(secret_key_base) = secret_key_base else {
                return Err(RuntimeError::InvalidOptions(format!(
                    "Option --{OPTION_COOKIE} is enabled, which requires --{OPTION_SECRET_KEY_BASE}"
                )));
            };
            Source::Cookie {
                value: value.to_string(),
                secret_key_base: secret_key_base.to_string(),
            }
        } else {
            let (secret, purpose) = signing_options(secret, purpose)?;
            match (verify, sign) {
                (Some(signed), _) => Source::Verify {
                    signed: signed.to_string(),
                    secret,
                    purpose,
                },
                (_, Some(value)) => Source::Sign {
                    value: value.to_string(),
                    secret,
                    purpose,
                },
                (None, None) => {
                    return Err(RuntimeError::InvalidOptions(
                        "No input mode provided!".to_string(),
                    ))
                }
            }
        };

        // Ensure the provided format is valid
        let export_type = match format {
            Some(format) => ExportType::from_cli(format).ok_or_else(|| {
                RuntimeError::InvalidOptions(format!(
                    "{format} is not a valid export type! Must be one of <{SUPPORTED_FORMATS}>"
                ))
            })?,
            None => ExportType::Txt,
        };

        let max_depth = max_depth.copied().unwrap_or(DEFAULT_MAX_DEPTH);
        if !(1..=MAX_DEPTH_LIMIT).contains(&max_depth) {
            return Err(RuntimeError::InvalidOptions(format!(
                "Option --{OPTION_MAX_DEPTH} must be between 1 and {MAX_DEPTH_LIMIT}, got {max_depth}"
            )));
        }

        Ok(Options {
            source,
            export_type,
            max_depth,
            export_path: export_path.map(PathBuf::from),
        })
    }
}

/// Read the secret and purpose shared by `--verify` and `--sign`
fn signing_options(
    secret: Option<&String>,
    purpose: Option<&String>,
) -> Result<(Vec<u8>, String), RuntimeError> {
    let (Some(secret), Some(purpose)) = (secret, purpose) else {
        return Err(RuntimeError::InvalidOptions(format!(
            "Options --{OPTION_VERIFY} and --{OPTION_SIGN} require --{OPTION_SECRET} and --{OPTION_PURPOSE}"
        )));
    };
    let secret = BASE64_STANDARD.decode(secret).map_err(|why| {
        RuntimeError::InvalidOptions(format!("Option --{OPTION_SECRET} is not base64: {why}"))
    })?;
    Ok((secret, purpose.to_string()))
}

fn list_options(options: &[&str]) -> String {
    options
        .iter()
        .map(|option| format!("--{option}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Build the command line argument parser
fn get_command() -> Command {
    Command::new(crate_name!())
        .version(crate_version!())
        .about(crate_description!())
        .arg_required_else_help(true)
        .args(&[
            Arg::new(OPTION_MARSHAL)
                .short('m')
                .long(OPTION_MARSHAL)
                .help("Base64 encoded Marshal data to load\n")
                .display_order(0)
                .value_name("BASE64"),
            Arg::new(OPTION_INPUT)
                .short('i')
                .long(OPTION_INPUT)
                .help("Path to a file containing Marshal data\n")
                .display_order(1)
                .value_name("FILE"),
            Arg::new(OPTION_BASE64)
                .short('b')
                .long(OPTION_BASE64)
                .help("Treat the contents of the input file as base64 text\n")
                .action(ArgAction::SetTrue)
                .display_order(2),
            Arg::new(OPTION_COOKIE)
                .short('c')
                .long(OPTION_COOKIE)
                .help("Encrypted Rails session cookie value to decrypt\n")
                .display_order(3)
                .value_name("VALUE"),
            Arg::new(OPTION_SECRET_KEY_BASE)
                .short('k')
                .long(OPTION_SECRET_KEY_BASE)
                .help("The Rails application's secret_key_base, used to decrypt cookies\n")
                .display_order(4)
                .value_name("SECRET"),
            Arg::new(OPTION_VERIFY)
                .short('v')
                .long(OPTION_VERIFY)
                .help("Signed message to verify\n")
                .display_order(5)
                .value_name("SIGNED"),
            Arg::new(OPTION_SIGN)
                .short('s')
                .long(OPTION_SIGN)
                .help("Value to sign\n")
                .display_order(6)
                .value_name("VALUE"),
            Arg::new(OPTION_SECRET)
                .long(OPTION_SECRET)
                .help("Base64 encoded secret for signing and verifying messages\n")
                .display_order(7)
                .value_name("BASE64"),
            Arg::new(OPTION_PURPOSE)
                .short('p')
                .long(OPTION_PURPOSE)
                .help("Purpose the message is signed for\n")
                .display_order(8)
                .value_name("PURPOSE"),
            Arg::new(OPTION_FORMAT)
                .short('f')
                .long(OPTION_FORMAT)
                .help("Specify the output format\nIf omitted, the default is txt\n")
                .display_order(9)
                .value_name(SUPPORTED_FORMATS),
            Arg::new(OPTION_MAX_DEPTH)
                .short('d')
                .long(OPTION_MAX_DEPTH)
                .help(format!(
                    "Maximum nesting depth of Marshal values, at most {MAX_DEPTH_LIMIT}\nIf omitted, the default is {DEFAULT_MAX_DEPTH}\n"
                ))
                .value_parser(value_parser!(usize))
                .display_order(10)
                .value_name("DEPTH"),
            Arg::new(OPTION_EXPORT_PATH)
                .short('o')
                .long(OPTION_EXPORT_PATH)
                .help("Specify a file to write the result to\nIf omitted, the result is written to stdout\n")
                .display_order(11)
                .value_name("FILE"),
        ])
}

/// Parse arguments from the command line
pub fn from_command_line() -> ArgMatches {
    get_command().get_matches()
}

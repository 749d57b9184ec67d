use crate::CLAP_STYLING;
use clap::{arg, command};
use memcompat_scanner::navigator::DEFAULT_ENTRY_URL;
use url::Url;

pub fn command_argument_builder() -> clap::Command {
    clap::Command::new("memcompat")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("memcompat")
        .styles(CLAP_STYLING)
        .arg(
            arg!(-q --"quiet" "Suppress banner and non-essential output")
                .required(false)
                .global(true),
        )
        .arg(
            arg!(-v --"verbose" "Log every request and transition")
                .required(false)
                .global(true)
                .conflicts_with("quiet"),
        )
        .subcommand_required(false)
        .subcommand(
            command!("crawl")
                .about(
                    "Walk the compatibility lookup for one manufacturer and save a JSON record \
                per motherboard.",
                )
                .arg(
                    arg!(<MANUFACTURER>)
                        .required(true)
                        .help("Brand name exactly as listed by the lookup, e.g. Supermicro"),
                )
                .arg(
                    arg!(-o --"output-dir" <PATH>)
                        .required(false)
                        .help("Directory the Memory/<manufacturer>/<model>.json tree is written to")
                        .default_value("items"),
                )
                .arg(
                    arg!(-t --"threads" <NUM_WORKERS>)
                        .required(false)
                        .help("The number of requests allowed in flight at once.")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("4"),
                )
                .arg(
                    arg!(--"delay-ms" <MS>)
                        .required(false)
                        .help("Minimum delay between two requests to the lookup")
                        .value_parser(clap::value_parser!(u64))
                        .default_value("250"),
                )
                .arg(
                    arg!(--"retries" <NUM>)
                        .required(false)
                        .help("Retries for timeouts, connection errors and 5xx responses")
                        .value_parser(clap::value_parser!(u32))
                        .default_value("3"),
                )
                .arg(
                    arg!(--"timeout" <SECONDS>)
                        .required(false)
                        .help("Request timeout in seconds")
                        .value_parser(clap::value_parser!(u64))
                        .default_value("30"),
                )
                .arg(
                    arg!(--"entry-url" <URL>)
                        .required(false)
                        .help("Entry point that hands out the session cookie")
                        .value_parser(clap::value_parser!(Url))
                        .default_value(DEFAULT_ENTRY_URL),
                )
                .arg(
                    arg!(--"no-cache")
                        .required(false)
                        .help("Fetch every result page again instead of reusing responses")
                        .action(clap::ArgAction::SetTrue),
                ),
        )
}

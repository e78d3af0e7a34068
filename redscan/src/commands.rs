use crate::CLAP_STYLING;
use clap::{arg, command};
use url::Url;

fn max_pages_arg() -> clap::Arg {
    arg!(--"max-pages" <N>)
        .required(false)
        .help("Maximum number of pages to crawl")
        .value_parser(clap::value_parser!(usize))
        .default_value("50")
}

fn delay_arg() -> clap::Arg {
    arg!(--"delay-ms" <MS>)
        .required(false)
        .help("Pause between page fetches, in milliseconds")
        .value_parser(clap::value_parser!(u64))
        .default_value("500")
}

fn timeout_arg() -> clap::Arg {
    arg!(--"timeout" <SECONDS>)
        .required(false)
        .help("Request timeout in seconds")
        .value_parser(clap::value_parser!(u64))
        .default_value("10")
}

fn param_arg() -> clap::Arg {
    arg!(-p --"param" <NAME>)
        .required(false)
        .help("Query parameter to probe on the start URL (repeatable; default: its existing keys, else q)")
        .action(clap::ArgAction::Append)
}

fn data_dir_arg() -> clap::Arg {
    arg!(--"data-dir" <DIR>)
        .required(false)
        .help("Directory holding scan snapshots")
        .default_value("~/.config/redscan/scans")
}

fn format_arg() -> clap::Arg {
    arg!(-f --"format" <FORMAT>)
        .required(false)
        .help("Report format: text, json")
        .value_parser(["text", "json"])
        .default_value("text")
}

pub(crate) fn command_argument_builder() -> clap::Command {
    clap::Command::new("redscan")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("redscan")
        .styles(CLAP_STYLING)
        .arg(arg!(-q --"quiet" "Suppress banner and non-essential output").required(false))
        .arg(arg!(-v --"verbose" "Log every fetch, link and probe decision").required(false))
        .subcommand_required(false)
        .subcommand(
            command!("scan")
                .about(
                    "Crawl a host (or a file of hosts), check its headers and probe its forms \
                for naive reflection. Snapshots are written to the data directory.",
                )
                .arg(
                    arg!(-u --"url" <URL>)
                        .required(false)
                        .help("The URL to scan")
                        .value_parser(clap::value_parser!(Url))
                        .conflicts_with("hosts-file"),
                )
                .arg(
                    arg!(-H --"hosts-file" <PATH>)
                        .required(false)
                        .help("Path to a newline-delimited file of URLs to scan")
                        .value_parser(clap::value_parser!(std::path::PathBuf))
                        .conflicts_with("url"),
                )
                .arg(max_pages_arg())
                .arg(delay_arg())
                .arg(timeout_arg())
                .arg(
                    arg!(--"user-agent" <UA>)
                        .required(false)
                        .help("User-Agent header sent with every request")
                        .default_value(redscan_scanner::fetcher::DEFAULT_USER_AGENT),
                )
                .arg(param_arg())
                .arg(data_dir_arg())
                .arg(format_arg())
                .arg(
                    arg!(-o --"output" <PATH>)
                        .required(false)
                        .help("Save report to file (default: display to screen)")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                ),
        )
        .subcommand(
            command!("crawl")
                .about("Crawl a host without probing anything. Prints the pages and forms found.")
                .arg(
                    arg!(-u --"url" <URL>)
                        .required(true)
                        .help("The URL to crawl")
                        .value_parser(clap::value_parser!(Url)),
                )
                .arg(max_pages_arg())
                .arg(delay_arg()),
        )
        .subcommand(
            command!("probe")
                .about("Send one reflection marker through the query string of a URL")
                .arg(
                    arg!(-u --"url" <URL>)
                        .required(true)
                        .help("The URL to probe")
                        .value_parser(clap::value_parser!(Url)),
                )
                .arg(param_arg()),
        )
        .subcommand(
            command!("show")
                .about("Show a saved scan snapshot")
                .arg(arg!(<SCAN_ID>).help("The id printed when the scan started"))
                .arg(data_dir_arg())
                .arg(format_arg()),
        )
}

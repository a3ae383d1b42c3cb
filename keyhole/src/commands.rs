use crate::CLAP_STYLING;
use clap::{arg, command};
use url::Url;

pub(crate) fn command_argument_builder() -> clap::Command {
    clap::Command::new("keyhole")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("keyhole")
        .styles(CLAP_STYLING)
        .arg(arg!(-q --"quiet" "Suppress banner and non-essential output").required(false))
        .arg(
            arg!(--"cache-dir" <PATH>)
                .required(false)
                .global(true)
                .help(
                    "Knowledge cache location (overrides the KEYHOLE_CACHE_DIR environment \
                variable; default: .keyhole)",
                ),
        )
        .subcommand_required(false)
        .subcommand(
            command!("discover")
                .about(
                    "Fetch a page and extract API endpoints, embedded data and the \
                authentication scheme. Contributes findings to the domain's knowledge.",
                )
                .arg(
                    arg!(-u --"url" <URL>)
                        .required(true)
                        .help("The page URL to inspect")
                        .value_parser(clap::value_parser!(Url)),
                )
                .arg(
                    arg!(-f --"file" <PATH>)
                        .required(false)
                        .help("Read the page body from a local file instead of fetching it")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                )
                .arg(
                    arg!(--"marker" <FRAGMENT>)
                        .required(false)
                        .help("Path fragment that marks an API endpoint candidate")
                        .default_value("/api/"),
                )
                .arg(
                    arg!(--"delay" <MILLIS>)
                        .required(false)
                        .help("Pause before the request, for rate-limit friendliness")
                        .value_parser(clap::value_parser!(u64))
                        .default_value("0"),
                )
                .arg(
                    arg!(--"timeout" <SECONDS>)
                        .required(false)
                        .help("Request timeout in seconds")
                        .value_parser(clap::value_parser!(u64))
                        .default_value("15"),
                )
                .arg(
                    arg!(--"json")
                        .required(false)
                        .help("Emit the discovery result as JSON instead of a text report")
                        .action(clap::ArgAction::SetTrue),
                ),
        )
        .subcommand(
            command!("cached")
                .about("Show stored knowledge for a URL's domain without touching the network")
                .arg(
                    arg!(-u --"url" <URL>)
                        .required(true)
                        .help("Any URL on the domain of interest")
                        .value_parser(clap::value_parser!(Url)),
                )
                .arg(
                    arg!(--"json")
                        .required(false)
                        .help("Emit the record as JSON instead of a text report")
                        .action(clap::ArgAction::SetTrue),
                ),
        )
        .subcommand(command!("domains").about("List domains with stored knowledge"))
        .subcommand(
            command!("purge")
                .about("Delete the stored knowledge for one domain")
                .arg(
                    arg!(-d --"domain" <DOMAIN>)
                        .required(true)
                        .help("The domain key to purge, as shown by 'domains'"),
                ),
        )
}

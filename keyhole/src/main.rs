use commands::command_argument_builder;
use handlers::{handle_cached, handle_discover, handle_domains, handle_purge, resolve_cache_dir};
use keyhole_core::print_banner;

mod commands;
mod handlers;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cmd = command_argument_builder();
    let chosen_command = cmd.get_matches();
    let quiet = chosen_command.get_flag("quiet");

    // Show banner unless --quiet flag is set
    if !quiet {
        print_banner();
    }

    let Some((name, sub_matches)) = chosen_command.subcommand() else {
        // No subcommand provided, just show the banner
        return;
    };

    let cache_dir = resolve_cache_dir(
        sub_matches
            .get_one::<String>("cache-dir")
            .map(String::as_str),
    );

    let outcome = match name {
        "discover" => handle_discover(sub_matches, cache_dir).await,
        "cached" => handle_cached(sub_matches, cache_dir).await,
        "domains" => handle_domains(cache_dir).await,
        "purge" => handle_purge(sub_matches, cache_dir).await,
        _ => unreachable!("clap should ensure we don't get here"),
    };

    if let Err(e) = outcome {
        eprintln!("✗ {:#}", e);
        std::process::exit(1);
    }
}

pub const CLAP_STYLING: clap::builder::styling::Styles = clap::builder::styling::Styles::styled()
    .header(clap_cargo::style::HEADER)
    .usage(clap_cargo::style::USAGE)
    .literal(clap_cargo::style::LITERAL)
    .placeholder(clap_cargo::style::PLACEHOLDER)
    .error(clap_cargo::style::ERROR)
    .valid(clap_cargo::style::VALID)
    .invalid(clap_cargo::style::INVALID);

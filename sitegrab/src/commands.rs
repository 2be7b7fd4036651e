use crate::CLAP_STYLING;
use clap::arg;

pub fn command_argument_builder() -> clap::Command {
    clap::Command::new("sitegrab")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("sitegrab")
        .about("Download a resource, a list of resources, or mirror a site")
        .styles(CLAP_STYLING)
        .arg(
            arg!([URL])
                .required(false)
                .help("The URL to download (or the seed page with --mirror)"),
        )
        .arg(
            arg!(-O --"output-document" <FILE>)
                .required(false)
                .help("Save the resource under this file name")
                .conflicts_with_all(["mirror", "input-file"]),
        )
        .arg(
            arg!(-P --"directory-prefix" <DIR>)
                .required(false)
                .help("Directory to save files into")
                .default_value("."),
        )
        .arg(
            arg!(--"rate-limit" <RATE>)
                .required(false)
                .help("Maximum download speed, e.g. 400k, 2M, 1GB or 512B"),
        )
        .arg(
            arg!(-B --"background")
                .required(false)
                .help("Write progress to 'wget-log' instead of the terminal")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            arg!(--"mirror")
                .required(false)
                .help("Recursively download every page and asset on the seed's host")
                .action(clap::ArgAction::SetTrue)
                .conflicts_with("input-file"),
        )
        .arg(
            arg!(-i --"input-file" <FILE>)
                .required(false)
                .help("Path to a newline-delimited file of URLs to download")
                .value_parser(clap::value_parser!(std::path::PathBuf)),
        )
        .arg(
            arg!(-R --"reject" <LIST>)
                .required(false)
                .help("Comma-separated file suffixes to skip, e.g. jpg,gif"),
        )
        .arg(
            arg!(-t --"threads" <NUM_WORKERS>)
                .required(false)
                .help("Maximum number of concurrent downloads while mirroring")
                .value_parser(clap::value_parser!(usize))
                .default_value("1"),
        )
        .arg(
            arg!(--"no-check-certificate")
                .required(false)
                .help("Do not verify the server's TLS certificate")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            arg!(-f --"format" <FORMAT>)
                .required(false)
                .help("Summary format: text, json")
                .value_parser(["text", "json"])
                .default_value("text"),
        )
        .arg(
            arg!(-q --"quiet")
                .required(false)
                .help("No per-download progress, only the final summary")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            arg!(-v --"verbose")
                .required(false)
                .help("Enable debug logging on stderr")
                .action(clap::ArgAction::SetTrue),
        )
}

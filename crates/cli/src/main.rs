fn main() {
    if let Err(error) = opxpath_cli::run() {
        // run() installs the subscriber right after argument parsing.
        tracing::error!(%error, "opxpath failed");
        std::process::exit(1);
    }
}

mod cli;

fn main() {
    if let Err(e) = cli::run() {
        // the report was already printed
        if e.downcast_ref::<cli::ReportFailed>().is_some() {
            std::process::exit(1);
        }
        eprintln!("{e:#}"); // pretty anyhow chain
        std::process::exit(1);
    }
}

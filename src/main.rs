fn main() {
    if let Err(err) = csv2pg::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

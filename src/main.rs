fn main() {
    if let Err(e) = storefront::app::run_cli() {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

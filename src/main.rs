fn main() {
    if let Err(err) = ingredient_scanner_lib::run() {
        eprintln!("ingredient-scanner: {err:#}");
        std::process::exit(1);
    }
}

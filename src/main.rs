fn main() {
    if let Err(err) = retail_normalizer::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

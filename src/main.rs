fn main() {
    if let Err(err) = layoffs_clean::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn main() {
    std::process::exit(kanzi::cli::main());
}

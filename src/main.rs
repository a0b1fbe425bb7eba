fn main() {
  if let Err(e) = fintrack_client::run() {
    eprintln!("{e:#}");
    std::process::exit(1);
  }
}

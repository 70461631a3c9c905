fn main() {
    if let Err(err) = xo_blocker_lib::run() {
        eprintln!("xo-blocker: {err:?}");
        std::process::exit(1);
    }
}

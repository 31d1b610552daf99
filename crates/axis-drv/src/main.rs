fn main() {
    let args = std::env::args().skip(1);
    std::process::exit(axis_drv::run(args));
}

use oas_convert::cli::CommandLineInterface;

fn main() {
    env_logger::init();
    let code = CommandLineInterface::load().run();
    std::process::exit(code);
}

use std::process::ExitCode;

fn main() -> ExitCode {
    lsh::lib_main()
}

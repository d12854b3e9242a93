pub fn log_init() {
    use std::io::Write;
    // env_logger 通过环境变量 RUST_LOG 控制日志输出, 未设置时默认 info
    let env = env_logger::Env::default().default_filter_or("info");
    let _ = env_logger::Builder::from_env(env)
        .target(env_logger::Target::Stdout)
        .format(|buf, record| writeln!(buf, "{}: {}", record.level(), record.args()))
        .try_init();
}

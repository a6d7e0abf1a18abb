mod client_tests {
    pub mod helpers;

    mod authorization;
    mod config_flow;
    mod discovery;
    mod lifecycle;
    mod reauthorization;
    mod tokens;
}

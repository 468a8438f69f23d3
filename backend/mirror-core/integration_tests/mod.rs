mod mirror_tests {
    pub mod helpers;

    mod channel;
}

fn main() {
    // embuild emits the esp-idf link/cfg environment only for device builds;
    // host builds (tests, property suites) must stay toolchain-free.
    if std::env::var("CARGO_FEATURE_ESPIDF").is_ok() {
        embuild::espidf::sysenv::output();
    }
}

fn main() {
    // Device builds need the ESP-IDF environment exported to rustc; host
    // builds (simulation, tests) have nothing to generate.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}

fn main() {
    // Host builds have nothing to generate; the firmware image needs the
    // ESP-IDF environment exported for linking.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}

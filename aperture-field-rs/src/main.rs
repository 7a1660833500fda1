fn main() {
    aperture_field::cli::run();
}

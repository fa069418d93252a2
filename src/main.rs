fn main() {
    ward_triage::run()
}

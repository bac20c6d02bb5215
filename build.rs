fn main() {
    // Compile Slint UI files
    slint_build::compile("ui/main.slint").unwrap();

    // Embed Windows version info
    #[cfg(windows)]
    {
        let mut res = winres::WindowsResource::new();
        res.set("ProductName", "ParsecVDisplay");
        res.set("FileDescription", "Parsec Virtual Display manager");
        res.set("CompanyName", "ParsecVDisplay Contributors");
        res.set("OriginalFilename", "parsec-vdisplay.exe");
        res.set("FileVersion", env!("CARGO_PKG_VERSION"));
        res.set("ProductVersion", env!("CARGO_PKG_VERSION"));
        res.compile().unwrap();
    }
}

pub use crate::app::WallxCliApp;

mod app {
    use anyhow::{bail, Result};
    use chrono::{DateTime, Utc};
    use rand::seq::SliceRandom;
    use std::io::{self, BufRead, Write};
    use wallx_core::catalog::display_name;
    use wallx_core::photo_id::PhotoId;
    use wallx_core::*;

    const TITLE_WIDTH: usize = 40;

    enum Screen {
        Home,
        Category(String),
        Favorites,
    }

    pub struct WallxCliApp {
        app: WallxApp,
        screen: Screen,
        collection: WallpaperCollection,
    }

    impl WallxCliApp {
        pub fn new() -> Result<Self> {
            let config = Config::new()?;
            Ok(Self::from_app(WallxApp::new(config)?))
        }

        pub fn from_app(app: WallxApp) -> Self {
            let collection = app.home_collection();
            Self { app, screen: Screen::Home, collection }
        }

        pub fn app(&self) -> &WallxApp {
            &self.app
        }

        pub fn collection(&self) -> &WallpaperCollection {
            &self.collection
        }

        pub fn random(&self, count: usize) {
            let items = self.marked(self.app.gateway().random_photos(count));
            print_items(&items);
        }

        pub fn search(&self, query: &str, page: u32, per_page: u32) {
            let page = self.app.gateway().search_photos(query, page, per_page);
            println!("{} results for \"{}\"", page.total, query);
            print_items(&self.marked(page.results));
        }

        pub fn category(&mut self, id: &str) {
            self.open_category(id);
            self.print_collection();
        }

        pub fn show(&self, id: &str) {
            let mut item = self.app.gateway().photo_by_id(id);
            item.is_favorite = self.app.is_favorite(&item.id);
            println!("{}", describe(&item));
        }

        pub fn categories(&self) -> Result<()> {
            for category in self.app.categories()? {
                println!("{:<12} {}", category.id, category.name);
            }
            Ok(())
        }

        pub fn generate(&mut self, prompt: &str) {
            match self.collection.generate_from_prompt(prompt) {
                Some(item) => println!("{}", describe(&item)),
                None => println!("Nothing generated for \"{}\"", prompt),
            }
        }

        pub fn theme(&mut self, toggle: bool) {
            let theme = if toggle { self.app.toggle_theme() } else { self.app.theme() };
            println!("Theme: {}", theme);
        }

        pub fn login(&mut self, email: &str, password: &str) -> Result<()> {
            self.app.auth_mut().sign_in(email, password);
            self.report_auth("Signed in")
        }

        pub fn signup(&mut self, email: &str, password: &str) -> Result<()> {
            self.app.auth_mut().sign_up(email, password);
            self.report_auth("Account created")
        }

        pub fn logout(&mut self) -> Result<()> {
            let auth = self.app.auth_mut();
            auth.load_session();
            auth.sign_out();
            self.report_auth("Signed out")
        }

        pub fn reset(&mut self, email: &str) -> Result<()> {
            self.app.auth_mut().reset_password(email);
            self.report_auth("Reset requested")
        }

        pub fn whoami(&mut self) {
            let auth = self.app.auth_mut();
            auth.load_session();
            let Some(session) = auth.session.as_ref() else {
                println!("Not signed in");
                return;
            };
            println!("[{}] {}", auth.avatar_initial(), auth.email().unwrap_or("(no email)"));
            if let Some(expires) = session.expires_at.and_then(|at| DateTime::<Utc>::from_timestamp(at, 0)) {
                println!("Session expires {}", expires.format("%Y-%m-%d %H:%M UTC"));
            }
        }

        fn report_auth(&mut self, done: &str) -> Result<()> {
            let auth = self.app.auth_mut();
            if let Some(error) = auth.error.clone() {
                auth.clear_error();
                bail!(error);
            }
            match auth.notice.as_deref() {
                Some(notice) => println!("{}", notice),
                None => println!("{}", done),
            }
            Ok(())
        }

        // Shelf state wins for one-shot listings.
        fn marked(&self, items: Vec<WallpaperItem>) -> Vec<WallpaperItem> {
            items
                .into_iter()
                .map(|item| WallpaperItem { is_favorite: self.app.is_favorite(&item.id), ..item })
                .collect()
        }

        fn open_home(&mut self) {
            self.collection.deactivate();
            self.collection = self.app.home_collection();
            self.screen = Screen::Home;
            self.collection.load();
        }

        fn open_category(&mut self, id: &str) {
            self.collection.deactivate();
            self.collection = self.app.category_collection(id);
            self.screen = Screen::Category(id.to_string());
            self.collection.load();
        }

        fn open_favorites(&mut self) {
            self.collection.deactivate();
            self.collection = self.app.favorites_collection();
            self.screen = Screen::Favorites;
        }

        fn screen_title(&self) -> String {
            match &self.screen {
                Screen::Home => "Home".to_string(),
                Screen::Category(id) => display_name(id),
                Screen::Favorites => "Favorites".to_string(),
            }
        }

        fn print_collection(&self) {
            if let Some(message) = self.collection.error() {
                println!("{}", message);
            }
            print_items(self.collection.items());
        }

        pub fn toggle_favorite(&mut self, index: usize) -> Result<()> {
            let Some(id) = self.collection.items().get(index).map(|item| item.id.clone()) else {
                bail!("No wallpaper #{}", index + 1);
            };
            match self.collection.toggle_favorite(&id) {
                Some(FavoriteRoute::External) => {
                    // favorites screen: the shelf changed, show it again
                    self.open_favorites();
                    println!("Removed from favorites");
                }
                Some(FavoriteRoute::Local) => {
                    if let Some(item) = self.collection.find(&id) {
                        self.app.record_favorite(item)?;
                        let verb = if item.is_favorite { "Added to" } else { "Removed from" };
                        println!("{} favorites: {}", verb, item.title);
                    }
                }
                None => bail!("No wallpaper {}", id),
            }
            Ok(())
        }

        fn open_detail(&self, index: usize) -> Result<()> {
            let Some(item) = self.collection.items().get(index) else {
                bail!("No wallpaper #{}", index + 1);
            };
            // search ids resolve to their label in the detail view
            let title = PhotoId::parse(&item.id).search_label();
            let mut detail = self.app.gateway().photo_by_id(&item.id);
            detail.is_favorite = self.collection.is_favorite(&item.id);
            if let Some(title) = title {
                detail.title = title;
            }
            println!("{}", describe(&detail));
            Ok(())
        }

        fn switch_category(&mut self, input: &str) -> Result<()> {
            match input.trim().to_lowercase().as_str() {
                "home" => self.open_home(),
                "favorites" => self.open_favorites(),
                "" => {
                    let categories = self.app.categories()?;
                    let Some(category) = categories.choose(&mut rand::thread_rng()) else {
                        bail!("No categories available");
                    };
                    let id = category.id.clone();
                    self.open_category(&id);
                }
                id => self.open_category(id),
            }
            Ok(())
        }

        fn show_menu(&self) {
            let mut status = format!(
                "Showing: {} ({} wallpapers, page {})",
                self.screen_title(),
                self.collection.items().len(),
                self.collection.page()
            );
            if self.collection.is_loading() {
                status.push_str(" | loading");
            }

            println!("\n=== wallx - Wallpaper Browser ===");
            println!("{} | Theme: {}", status, self.app.theme());
            if let Some(message) = self.collection.error() {
                println!("! {}", message);
            }
            println!();
            print_items(self.collection.items());
            println!();
            println!("1. Refresh");
            println!("2. Load more");
            println!("3. Toggle favorite");
            println!("4. Open detail");
            println!("5. Switch category");
            println!("6. Exit");
            print!("\nSelect an option (1-6): ");
            let _ = io::stdout().flush();
        }

        pub fn browse(&mut self) -> Result<()> {
            let stdin = io::stdin();
            let mut input = stdin.lock();
            if !self.collection.is_parent_managed() && self.collection.items().is_empty() {
                self.collection.load();
            }

            loop {
                self.show_menu();
                let Some(choice) = read_line(&mut input)? else {
                    break;
                };

                match choice.as_str() {
                    "1" => {
                        if !self.collection.refresh() && self.collection.is_parent_managed() {
                            self.open_favorites();
                        }
                    }
                    "2" => {
                        self.collection.load_more();
                    }
                    "3" => {
                        let index = prompt_index(&mut input, "Wallpaper number: ")?;
                        if let Err(e) = index.map_or_else(|| Ok(()), |i| self.toggle_favorite(i)) {
                            eprintln!("Failed to toggle favorite: {}", e);
                        }
                    }
                    "4" => {
                        let index = prompt_index(&mut input, "Wallpaper number: ")?;
                        if let Err(e) = index.map_or_else(|| Ok(()), |i| self.open_detail(i)) {
                            eprintln!("Failed to open wallpaper: {}", e);
                        }
                    }
                    "5" => {
                        print!("Category id, 'home', 'favorites' or empty for a random one: ");
                        let _ = io::stdout().flush();
                        let answer = read_line(&mut input)?.unwrap_or_default();
                        if let Err(e) = self.switch_category(&answer) {
                            eprintln!("Failed to switch category: {}", e);
                        }
                    }
                    "6" => {
                        println!("Exiting wallx...");
                        break;
                    }
                    _ => {
                        println!("Invalid option. Please select 1-6.");
                    }
                }
            }

            self.collection.deactivate();
            Ok(())
        }
    }

    /// `None` at end of input.
    fn read_line(input: &mut impl BufRead) -> Result<Option<String>> {
        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    fn prompt_index(input: &mut impl BufRead, prompt: &str) -> Result<Option<usize>> {
        print!("{}", prompt);
        let _ = io::stdout().flush();
        let answer = read_line(input)?.unwrap_or_default();
        let index = parse_choice(&answer);
        if index.is_none() {
            println!("Invalid number: {}", answer);
        }
        Ok(index)
    }

    /// One-based menu number to a list index.
    pub(crate) fn parse_choice(input: &str) -> Option<usize> {
        input.trim().parse::<usize>().ok()?.checked_sub(1)
    }

    pub(crate) fn list_line(position: usize, item: &WallpaperItem) -> String {
        let mark = if item.is_favorite { '*' } else { ' ' };
        let mut title: String = item.title.chars().take(TITLE_WIDTH).collect();
        if item.title.chars().count() > TITLE_WIDTH {
            title.push_str("...");
        }
        format!("{:>3}. [{}] {} ({})", position + 1, mark, title, item.id)
    }

    pub(crate) fn describe(item: &WallpaperItem) -> String {
        let mut lines = vec![
            format!("{}{}", item.title, if item.is_favorite { " *" } else { "" }),
            format!("  id:       {}", item.id),
            format!("  image:    {}", item.image_url),
        ];
        if let Some(category) = &item.category {
            lines.push(format!("  category: {}", category));
        }
        if let Some(author) = &item.author {
            lines.push(format!("  author:   {}", author));
        }
        if let Some(download) = &item.download_url {
            lines.push(format!("  download: {}", download));
        }
        lines.join("\n")
    }

    fn print_items(items: &[WallpaperItem]) {
        if items.is_empty() {
            println!("(no wallpapers)");
        }
        for (position, item) in items.iter().enumerate() {
            println!("{}", list_line(position, item));
        }
    }

}

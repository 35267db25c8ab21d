use rocket::launch;

#[launch]
fn rocket() -> _ {
    items_api::rocket()
}
